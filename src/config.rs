use std::env;

/* ====== Caption templates ======
   Overridable via IMDB_TEMPLATE / MDL_TEMPLATE; placeholders are the
   DetailRecord field names, unknown placeholders render empty. */

pub const DEFAULT_IMDB_TEMPLATE: &str = "\
<b>🎬 Title:</b> <a href=\"{url}\">{title} ({year})</a> <code>[{kind}]</code>
<b>🏆 Rating:</b> <i>{rating} ({votes} votes)</i>
<b>🔞 Certificate:</b> {certificate}
<b>📆 Released:</b> {release_date}
<b>⏱ Runtime:</b> {runtime}
<b>🎭 Genre:</b> {genres}
<b>🎥 Director:</b> {director}
<b>✍️ Writer:</b> {writer}
<b>👥 Cast:</b> {cast}

<b>📖 Story Line:</b> <code>{plot}</code>

<b>🏷 Tags:</b> {tags}";

pub const DEFAULT_MDL_TEMPLATE: &str = "\
<b>🎬 Title:</b> <a href=\"{url}\">{title}</a> <code>[{type}]</code>
<b>🌍 Country:</b> {country}
<b>🏆 Score:</b> <i>{score}</i> | <b>Rated:</b> <i>{rating}</i>
<b>📛 Also Known As:</b> {aka}
<b>🎞 Episodes:</b> {episodes} | <b>⏱</b> {duration}
<b>📆 Aired:</b> {aired_date} ({aired_on})
<b>📡 Network:</b> {org_network}
<b>🎭 Genre:</b> {genres}
<b>🎥 Director:</b> {director}
<b>✍️ Screenwriter:</b> {screenwriter}
<b>👥 Cast:</b> {cast}

<b>📖 Synopsis:</b> <code>{synopsis}</code>

<b>🏷 Tags:</b> {tags}";

#[derive(Debug, Clone)]
pub struct Config {
    pub imdb_template: String,
    pub mdl_template: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            imdb_template: env::var("IMDB_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_IMDB_TEMPLATE.to_string()),
            mdl_template: env::var("MDL_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_MDL_TEMPLATE.to_string()),
        }
    }
}
