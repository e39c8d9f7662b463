use crate::format::{self, CastCredit, DetailRecord};
use crate::lookup::{LookupError, SearchHit};
use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;

const SUGGESTION_API: &str = "https://v3.sg.media-imdb.com";
const IMDB_BASE: &str = "https://www.imdb.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; tg-title-lookup/1.0)";

const PLOT_LIMIT: usize = 300;
const MAX_RESULTS: usize = 10;

// IMDb embeds the structured title data as JSON-LD in the page head.
static JSON_LD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script type="application/ld\+json">(.*?)</script>"#).unwrap()
});
static ISO_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?").unwrap());

#[derive(Clone)]
pub struct ImdbClient {
    suggest_base: String,
    title_base: String,
    http: Client,
    cache: Cache<String, Arc<Title>>,
}

impl ImdbClient {
    pub fn new() -> Self {
        Self::with_bases(SUGGESTION_API, IMDB_BASE)
    }

    /// Custom endpoints, used by tests against a local mock server.
    pub fn with_bases(suggest_base: impl Into<String>, title_base: impl Into<String>) -> Self {
        Self {
            suggest_base: suggest_base.into().trim_end_matches('/').to_string(),
            title_base: title_base.into().trim_end_matches('/').to_string(),
            http: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            cache: Cache::builder()
                .max_capacity(512)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }

    /// Title search via the suggestion API, capped to `MAX_RESULTS` hits.
    /// Only `tt`-prefixed entries are titles; people and keywords are skipped.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, LookupError> {
        let query = query.trim().to_lowercase();
        let bucket = query.chars().next().unwrap_or('a');
        let url = format!(
            "{}/suggestion/{}/{}.json",
            self.suggest_base,
            bucket,
            urlencoding::encode(&query)
        );
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(vec![]);
        }
        let data: SuggestResp = resp.json().await?;
        Ok(data
            .d
            .into_iter()
            .filter_map(|node| {
                let id = node.id.strip_prefix("tt")?.to_string();
                Some(SearchHit { id, title: node.l, year: node.y })
            })
            .take(MAX_RESULTS)
            .collect())
    }

    /// Full title detail by numeric id (the `tt` prefix stripped), parsed
    /// out of the title page's JSON-LD blob. Cached for a few minutes.
    pub async fn title(&self, id: &str) -> Result<Option<Arc<Title>>, LookupError> {
        if !id.chars().all(|c| c.is_ascii_digit()) || id.is_empty() {
            return Ok(None);
        }
        if let Some(hit) = self.cache.get(id).await {
            return Ok(Some(hit));
        }
        let url = format!("{}/title/tt{}/", self.title_base, id);
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body = resp.text().await?;
        let Some(blob) = JSON_LD_RE
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            return Ok(None);
        };
        let title: Title = serde_json::from_str(blob)?;
        let title = Arc::new(title);
        self.cache.insert(id.to_string(), title.clone()).await;
        Ok(Some(title))
    }
}

impl Default for ImdbClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Poster fallback: ask the CDN for a fixed-width render instead of the
/// original, which Telegram sometimes rejects for its dimensions.
pub fn poster_fallback(url: &str) -> String {
    url.replace(".jpg", "._V1_UX360.jpg")
}

/// Flatten JSON-LD into caption fields.
pub fn detail_record(title: &Title, id: &str) -> DetailRecord {
    let mut rec = DetailRecord::new();

    let mut put = |key: &'static str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            rec.insert(key, v);
        }
    };

    put("title", title.name.as_deref().map(format::html_escape));
    put("aka", title.alternate_name.as_deref().map(format::html_escape));
    put("kind", title.kind.as_deref().map(kind_label));
    put(
        "year",
        title
            .date_published
            .as_deref()
            .and_then(|d| d.get(..4))
            .map(str::to_string),
    );
    put("release_date", title.date_published.clone());
    put(
        "rating",
        title.aggregate_rating.as_ref().and_then(|r| r.rating_value).map(|v| v.to_string()),
    );
    put(
        "votes",
        title.aggregate_rating.as_ref().and_then(|r| r.rating_count).map(|v| v.to_string()),
    );
    put("certificate", title.content_rating.clone());
    put("runtime", title.duration.as_deref().and_then(runtime_label));
    put("genres", Some(format::list_to_hash(&title.genre, false, true)));
    put("cast", Some(format::cast_to_str(&person_credits(&title.actor))));
    put("director", Some(person_names(&title.director)));
    put("writer", Some(person_names(&title.creator)));
    put(
        "plot",
        title
            .description
            .as_deref()
            .map(|p| format::clip(&format::html_escape(p), PLOT_LIMIT)),
    );
    put(
        "tags",
        title
            .keywords
            .as_deref()
            .map(|k| {
                let tags: Vec<String> = k
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                format::list_to_str(&tags)
            }),
    );
    put("poster", title.image.clone());
    put("trailer", title.trailer.as_ref().and_then(|t| t.url.clone()));
    put(
        "url",
        title
            .url
            .as_deref()
            .map(absolute_url)
            .or_else(|| Some(format!("{IMDB_BASE}/title/tt{id}/"))),
    );

    rec
}

fn kind_label(kind: &str) -> String {
    match kind {
        "Movie" => "Movie".to_string(),
        "TVSeries" => "TV Series".to_string(),
        "TVEpisode" => "TV Episode".to_string(),
        "TVMiniSeries" => "TV Mini Series".to_string(),
        other => other.to_string(),
    }
}

/// `PT2H22M` -> `2h 22m`.
fn runtime_label(duration: &str) -> Option<String> {
    let caps = ISO_DURATION_RE.captures(duration)?;
    let hours = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
    let minutes = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
    match (hours, minutes) {
        (Some(h), Some(m)) => Some(format!("{h}h {m}m")),
        (Some(h), None) => Some(format!("{h}h")),
        (None, Some(m)) => Some(format!("{m}m")),
        (None, None) => None,
    }
}

fn person_credits(people: &[Person]) -> Vec<CastCredit> {
    people
        .iter()
        .filter_map(|p| {
            let name = p.name.clone()?;
            Some(CastCredit {
                name,
                link: p.url.as_deref().map(absolute_url).unwrap_or_default(),
            })
        })
        .collect()
}

// Creators mix Person and Organization nodes; only people get named.
fn person_names(people: &[Person]) -> String {
    let names: Vec<String> = people
        .iter()
        .filter(|p| p.kind.as_deref() != Some("Organization"))
        .filter_map(|p| p.name.as_deref().map(format::html_escape))
        .collect();
    format::list_to_str(&names)
}

fn absolute_url(url: &str) -> String {
    if url.starts_with('/') {
        format!("{IMDB_BASE}{url}")
    } else {
        url.to_string()
    }
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct SuggestResp {
    #[serde(default)]
    d: Vec<SuggestNode>,
}

#[derive(Deserialize, Debug)]
struct SuggestNode {
    id: String,
    l: String,
    #[serde(default)]
    y: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Title {
    #[serde(default, rename = "@type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "alternateName")]
    pub alternate_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "datePublished")]
    pub date_published: Option<String>,
    #[serde(default, rename = "contentRating")]
    pub content_rating: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub genre: Vec<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub actor: Vec<Person>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub director: Vec<Person>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub creator: Vec<Person>,
    #[serde(default, rename = "aggregateRating")]
    pub aggregate_rating: Option<AggregateRating>,
    #[serde(default)]
    pub trailer: Option<Trailer>,
}

impl Title {
    pub fn year(&self) -> Option<i32> {
        self.date_published
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Person {
    #[serde(default, rename = "@type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AggregateRating {
    #[serde(default, rename = "ratingValue")]
    pub rating_value: Option<f64>,
    #[serde(default, rename = "ratingCount")]
    pub rating_count: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct Trailer {
    #[serde(default)]
    pub url: Option<String>,
}

// JSON-LD writes single-element collections as bare objects.
fn one_or_many<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }
    Ok(match Option::<OneOrMany<T>>::deserialize(de)? {
        None => vec![],
        Some(OneOrMany::One(x)) => vec![x],
        Some(OneOrMany::Many(xs)) => xs,
    })
}
