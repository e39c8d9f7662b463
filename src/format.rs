use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/* ====== Caption field formatting ======
   Shared between the IMDb and MyDramaList flows: bounded list rendering,
   hashtag decoration and caption-template substitution. */

/// How many elements of a metadata list make it into the caption.
pub const LIST_ITEMS: usize = 4;

pub static GENRE_EMOJI: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Action", "🚀"),
        ("Adult", "🔞"),
        ("Adventure", "🌋"),
        ("Animation", "🎠"),
        ("Biography", "📜"),
        ("Comedy", "🪗"),
        ("Crime", "🔪"),
        ("Documentary", "🎞"),
        ("Drama", "🎭"),
        ("Family", "👨‍👩‍👧‍👦"),
        ("Fantasy", "🫧"),
        ("Film Noir", "🎯"),
        ("Game Show", "🎮"),
        ("History", "🏛"),
        ("Horror", "🧟"),
        ("Musical", "🎻"),
        ("Music", "🎸"),
        ("Mystery", "🧳"),
        ("News", "📰"),
        ("Reality-TV", "🖥"),
        ("Romance", "🥰"),
        ("Sci-Fi", "🌠"),
        ("Short", "📝"),
        ("Sport", "⛳"),
        ("Talk-Show", "👨‍🍳"),
        ("Thriller", "🗡"),
        ("War", "⚔"),
        ("Western", "🪩"),
    ])
});

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Caption fields keyed by placeholder name; absent source data is simply
/// not inserted, and [`fill_template`] renders missing keys as "".
pub type DetailRecord = HashMap<&'static str, String>;

/// A credited person with a profile link, rendered as an HTML anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastCredit {
    pub name: String,
    pub link: String,
}

/// First `LIST_ITEMS` elements joined with ", ", no trailing separator.
pub fn list_to_str(items: &[String]) -> String {
    items
        .iter()
        .take(LIST_ITEMS)
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cast rendering: each credit becomes `<a href="link">name</a>`, capped and
/// joined like [`list_to_str`]. A single credit is still an anchor.
pub fn cast_to_str(cast: &[CastCredit]) -> String {
    cast.iter()
        .take(LIST_ITEMS)
        .map(|c| format!(r#"<a href="{}">{}</a>"#, c.link, html_escape(&c.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Hashtag rendering: `Film Noir` -> `#Film_Noir`, optionally prefixed with a
/// country flag or a genre emoji. Lookup misses drop the prefix silently; a
/// single element goes through the same decoration as the general case.
pub fn list_to_hash(items: &[String], country_flag: bool, genre_emoji: bool) -> String {
    items
        .iter()
        .take(LIST_ITEMS)
        .map(|item| {
            let mut piece = String::new();
            if country_flag {
                if let Some(flag) = country_emoji::flag(item) {
                    piece.push_str(&flag);
                    piece.push(' ');
                }
            }
            if genre_emoji {
                if let Some(emoji) = GENRE_EMOJI.get(item.as_str()) {
                    piece.push_str(emoji);
                    piece.push(' ');
                }
            }
            piece.push('#');
            piece.push_str(&item.replace([' ', '-'], "_"));
            piece
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Substitute `{field}` placeholders from the record; unknown placeholders
/// render as the empty string rather than erroring.
pub fn fill_template(template: &str, fields: &DetailRecord) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            fields
                .get(caps.get(1).map(|m| m.as_str()).unwrap_or_default())
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Grapheme-aware clip with a `...` suffix for overlong synopses.
pub fn clip(s: &str, max: usize) -> String {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    if graphemes.len() <= max {
        s.to_string()
    } else {
        let mut out: String = graphemes[..max].concat();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_to_str_empty_is_empty() {
        assert_eq!(list_to_str(&[]), "");
    }

    #[test]
    fn list_to_str_single_has_no_separator() {
        assert_eq!(list_to_str(&strings(&["a"])), "a");
    }

    #[test]
    fn list_to_str_caps_at_four() {
        assert_eq!(
            list_to_str(&strings(&["a", "b", "c", "d", "e"])),
            "a, b, c, d"
        );
    }

    #[test]
    fn cast_to_str_single_is_still_an_anchor() {
        let cast = [CastCredit {
            name: "Lee Min-ho".into(),
            link: "https://mydramalist.com/people/lee-min-ho".into(),
        }];
        assert_eq!(
            cast_to_str(&cast),
            r#"<a href="https://mydramalist.com/people/lee-min-ho">Lee Min-ho</a>"#
        );
    }

    #[test]
    fn cast_to_str_escapes_names_and_caps() {
        let cast: Vec<CastCredit> = (0..5)
            .map(|i| CastCredit {
                name: format!("A<{i}>"),
                link: format!("https://x/{i}"),
            })
            .collect();
        let out = cast_to_str(&cast);
        assert_eq!(out.matches("<a href").count(), 4);
        assert!(out.contains("A&lt;0&gt;"));
        assert!(!out.ends_with(", "));
    }

    #[test]
    fn hash_single_genre_gets_emoji() {
        assert_eq!(list_to_hash(&strings(&["Action"]), false, true), "🚀 #Action");
    }

    #[test]
    fn hash_replaces_spaces_and_hyphens() {
        assert_eq!(
            list_to_hash(&strings(&["Film Noir", "Sci-Fi"]), false, true),
            "🎯 #Film_Noir, 🌠 #Sci_Fi"
        );
    }

    #[test]
    fn hash_unknown_genre_has_no_prefix() {
        assert_eq!(list_to_hash(&strings(&["Mockumentary"]), false, true), "#Mockumentary");
    }

    #[test]
    fn hash_flag_lookup_miss_degrades_silently() {
        assert_eq!(
            list_to_hash(&strings(&["Unknown Country"]), true, false),
            "#Unknown_Country"
        );
    }

    #[test]
    fn hash_known_country_is_flagged() {
        let out = list_to_hash(&strings(&["Japan"]), true, false);
        assert!(out.ends_with("#Japan"), "{out}");
        assert_ne!(out, "#Japan", "expected a flag prefix");
    }

    #[test]
    fn hash_caps_at_four_without_trailing_separator() {
        let out = list_to_hash(&strings(&["a", "b", "c", "d", "e"]), false, false);
        assert_eq!(out, "#a, #b, #c, #d");
    }

    #[test]
    fn template_missing_field_renders_empty() {
        let mut fields = DetailRecord::new();
        fields.insert("title", "Oldboy".to_string());
        assert_eq!(
            fill_template("<b>{title}</b> {rating}", &fields),
            "<b>Oldboy</b> "
        );
    }

    #[test]
    fn template_keeps_literal_text() {
        let fields = DetailRecord::new();
        assert_eq!(fill_template("no placeholders here", &fields), "no placeholders here");
    }

    #[test]
    fn clip_is_grapheme_aware() {
        assert_eq!(clip("short", 300), "short");
        let flags = "🇰🇷🇯🇵🇨🇳";
        assert_eq!(clip(flags, 2), "🇰🇷🇯🇵...");
    }
}
