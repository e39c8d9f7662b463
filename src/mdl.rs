use crate::format::{self, CastCredit, DetailRecord};
use crate::lookup::{LookupError, SearchHit};
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;

/// Public kuryana mirror of MyDramaList. Do not abuse.
const MDL_API: &str = "https://kuryana.vercel.app";

const SYNOPSIS_LIMIT: usize = 300;
const MAX_RESULTS: usize = 10;

#[derive(Clone)]
pub struct MdlClient {
    base: String,
    http: Client,
    cache: Cache<String, Arc<Drama>>,
}

impl MdlClient {
    pub fn new() -> Self {
        Self::with_base(MDL_API)
    }

    /// Custom API base, used by tests against a local mock server.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            cache: Cache::builder()
                .max_capacity(512)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }

    /// Title search, capped to `MAX_RESULTS` hits; a non-2xx answer from the
    /// mirror counts as "no hits".
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, LookupError> {
        let url = format!("{}/search/q/{}", self.base, urlencoding::encode(query));
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(vec![]);
        }
        let data: SearchResp = resp.json().await?;
        Ok(data
            .results
            .dramas
            .into_iter()
            .map(|d| SearchHit { id: d.slug, title: d.title, year: d.year })
            .take(MAX_RESULTS)
            .collect())
    }

    /// Full drama detail by slug, cached for a few minutes.
    pub async fn drama(&self, slug: &str) -> Result<Option<Arc<Drama>>, LookupError> {
        if let Some(hit) = self.cache.get(slug).await {
            return Ok(Some(hit));
        }
        let url = format!("{}/id/{}", self.base, slug);
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let data: DetailResp = resp.json().await?;
        let drama = Arc::new(data.data);
        self.cache.insert(slug.to_string(), drama.clone()).await;
        Ok(Some(drama))
    }
}

impl Default for MdlClient {
    fn default() -> Self {
        Self::new()
    }
}

/// MDL posters come in a cropped `c` and a full `f` variant; we prefer the
/// full one and fall back to the cropped one on delivery failure.
pub fn poster_url(drama: &Drama) -> Option<String> {
    drama
        .poster
        .as_deref()
        .map(|p| p.replace("c.jpg?v=1", "f.jpg?v=1").trim().to_string())
        .filter(|p| !p.is_empty())
}

pub fn poster_fallback(url: &str) -> String {
    url.replace("f.jpg?v=1", "c.jpg?v=1")
}

/// Flatten the API response into caption fields.
pub fn detail_record(drama: &Drama) -> DetailRecord {
    let d = &drama.details;
    let o = &drama.others;
    let mut rec = DetailRecord::new();

    let mut put = |key: &'static str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            rec.insert(key, v);
        }
    };

    put("title", drama.title.as_deref().map(format::html_escape));
    put("score", d.score.clone());
    put("aka", Some(format::html_escape(&format::list_to_str(&drama.also_known_as))));
    put("episodes", d.episodes.clone());
    put("type", d.kind.clone());
    put(
        "country",
        d.country
            .clone()
            .map(|c| format::list_to_hash(&[c], true, false)),
    );
    put("cast", Some(format::cast_to_str(&cast_credits(&drama.casts))));
    put("aired_date", d.aired.clone().or_else(|| Some("N/A".to_string())));
    put("aired_on", d.aired_on.clone());
    put("org_network", d.original_network.clone());
    put("duration", d.duration.clone());
    put("watchers", d.watchers.clone());
    put("ranked", d.ranked.clone());
    put("popularity", d.popularity.clone());
    put("related_content", Some(format::list_to_str(&o.related_content)));
    put("native_title", Some(format::html_escape(&format::list_to_str(&o.native_title))));
    put("director", Some(format::html_escape(&format::list_to_str(&o.director))));
    put("screenwriter", Some(format::html_escape(&format::list_to_str(&o.screenwriter))));
    put("genres", Some(format::list_to_hash(&o.genres, false, true)));
    put("tags", Some(format::html_escape(&format::list_to_str(&o.tags))));
    put("poster", poster_url(drama));
    put(
        "synopsis",
        drama
            .synopsis
            .as_deref()
            .map(|s| format::clip(&format::html_escape(s), SYNOPSIS_LIMIT)),
    );
    put("rating", drama.rating.map(|r| format!("{r} / 10")));
    put("content_rating", d.content_rating.clone());
    put("url", drama.link.clone());

    rec
}

fn cast_credits(casts: &[MdlCast]) -> Vec<CastCredit> {
    casts
        .iter()
        .filter_map(|c| {
            c.name.clone().map(|name| CastCredit {
                name,
                link: c.link.clone().unwrap_or_default(),
            })
        })
        .collect()
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct SearchResp {
    #[serde(default)]
    results: SearchResults,
}

#[derive(Deserialize, Debug, Default)]
struct SearchResults {
    #[serde(default)]
    dramas: Vec<DramaHit>,
}

#[derive(Deserialize, Debug)]
struct DramaHit {
    slug: String,
    title: String,
    #[serde(default)]
    year: Option<i32>,
}

#[derive(Deserialize, Debug)]
struct DetailResp {
    data: Drama,
}

#[derive(Deserialize, Debug, Default)]
pub struct Drama {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub also_known_as: Vec<String>,
    #[serde(default)]
    pub casts: Vec<MdlCast>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub others: Others,
}

#[derive(Deserialize, Debug, Default)]
pub struct MdlCast {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Details {
    #[serde(default, deserialize_with = "stringly")]
    pub score: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub episodes: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub aired: Option<String>,
    #[serde(default)]
    pub aired_on: Option<String>,
    #[serde(default)]
    pub original_network: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub watchers: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub ranked: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub popularity: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Others {
    #[serde(default)]
    pub related_content: Vec<String>,
    #[serde(default)]
    pub native_title: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub screenwriter: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// The mirror is loose about numbers vs strings (episode counts, ranks);
// accept either.
fn stringly<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    Ok(v.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}
