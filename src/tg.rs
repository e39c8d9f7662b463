use crate::config::Config;
use crate::format;
use crate::imdb::{self, ImdbClient};
use crate::lookup::{LookupError, SearchHit};
use crate::mdl::{self, MdlClient};
use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{
        CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode,
    },
    utils::command::BotCommands,
};
use thiserror::Error;
use tracing::warn;

static IMDB_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?imdb\.com/title/tt(\d+)").unwrap());
static MDL_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?mydramalist\.com/([^/\s?#]+)").unwrap());

// Telegram rejects photo captions above 1024 UTF-16 code units; longer
// captions go out as text.
const CAPTION_LIMIT: usize = 1024;

/* ====== Commands ====== */
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
enum Command {
    #[command(description = "search IMDb for a movie / TV series")]
    Imdb(String),
    #[command(description = "search MyDramaList for a drama")]
    Mdl(String),
    #[command(description = "show help")]
    Help,
}

pub async fn run(bot: Bot, imdb: ImdbClient, mdl: MdlClient, config: Config) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint({
                    let imdb = imdb.clone();
                    let mdl = mdl.clone();
                    move |bot: Bot, msg: Message, cmd: Command| {
                        let imdb = imdb.clone();
                        let mdl = mdl.clone();
                        async move { on_command(bot, msg, cmd, &imdb, &mdl).await }
                    }
                }),
        )
        .branch(Update::filter_callback_query().endpoint({
            move |bot: Bot, q: CallbackQuery| {
                let imdb = imdb.clone();
                let mdl = mdl.clone();
                let config = config.clone();
                async move { on_callback(bot, q, &imdb, &mdl, &config).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    imdb: &ImdbClient,
    mdl: &MdlClient,
) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Imdb(arg) => imdb_search(&bot, &msg, &arg, imdb).await?,
        Command::Mdl(arg) => mdl_search(&bot, &msg, &arg, mdl).await?,
    }
    Ok(())
}

/* ====== /imdb ====== */
async fn imdb_search(bot: &Bot, msg: &Message, arg: &str, imdb: &ImdbClient) -> ResponseResult<()> {
    let Some(user_id) = msg.from.as_ref().map(|u| u.id.0) else {
        return Ok(());
    };
    let arg = arg.trim();
    if arg.is_empty() {
        bot.send_message(
            msg.chat.id,
            "<i>Send Movie / TV Series Name along with /imdb Command or send IMDb URL</i>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let placeholder = bot
        .send_message(msg.chat.id, "<code>Searching IMDB ...</code>")
        .parse_mode(ParseMode::Html)
        .await?;

    // A title URL skips the search and resolves that one id.
    let hits = if let Some(caps) = IMDB_URL_RE.captures(arg) {
        let id = caps[1].to_string();
        match none_on_error(imdb.title(&id).await, "imdb") {
            Some(t) => vec![SearchHit {
                title: t.name.clone().unwrap_or_default(),
                year: t.year(),
                id,
            }],
            None => vec![],
        }
    } else {
        empty_on_error(imdb.search(arg).await, "imdb")
    };

    if hits.is_empty() {
        bot.edit_message_text(
            msg.chat.id,
            placeholder.id,
            "<i>No Results Found</i>, Try Again or Use <b>Title ID</b>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.edit_message_text(
        msg.chat.id,
        placeholder.id,
        "<b><i>Here What I found on IMDb.com</i></b>",
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard_results(Namespace::Imdb, user_id, &hits))
    .await?;
    Ok(())
}

/* ====== /mdl ====== */
async fn mdl_search(bot: &Bot, msg: &Message, arg: &str, mdl: &MdlClient) -> ResponseResult<()> {
    let Some(user_id) = msg.from.as_ref().map(|u| u.id.0) else {
        return Ok(());
    };
    let arg = arg.trim();
    if arg.is_empty() {
        bot.send_message(
            msg.chat.id,
            "<i>Send Movie / TV Series Name along with /mdl Command or send MyDramaList Link</i>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let placeholder = bot
        .send_message(msg.chat.id, "<i>Searching in MyDramaList ...</i>")
        .parse_mode(ParseMode::Html)
        .await?;

    let hits = if let Some(caps) = MDL_URL_RE.captures(arg) {
        let slug = caps[1].to_string();
        match none_on_error(mdl.drama(&slug).await, "mdl") {
            Some(d) => vec![SearchHit {
                title: d.title.clone().unwrap_or_default(),
                year: None,
                id: slug,
            }],
            None => vec![],
        }
    } else {
        empty_on_error(mdl.search(arg).await, "mdl")
    };

    if hits.is_empty() {
        bot.edit_message_text(
            msg.chat.id,
            placeholder.id,
            "<i>No Results Found</i>, Try Again or Use <b>MyDramaList Link</b>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.edit_message_text(
        msg.chat.id,
        placeholder.id,
        "<b><i>Dramas found on MyDramaList :</i></b>",
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard_results(Namespace::Mdl, user_id, &hits))
    .await?;
    Ok(())
}

/* ====== Callback buttons ======
   payload: <namespace> <user_id> <action> [<target>]
   movie/drama — show the detail caption, close — dismiss the menu */
async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    imdb: &ImdbClient,
    mdl: &MdlClient,
    config: &Config,
) -> ResponseResult<()> {
    let Some(token) = q.data.as_deref().and_then(CallbackToken::parse) else {
        return Ok(());
    };

    // buttons are bound to the user who issued the search
    if q.from.id.0 != token.user_id {
        bot.answer_callback_query(q.id.clone())
            .text("Not Yours!")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;

    match &token.action {
        Action::Close => {
            bot.answer_callback_query(q.id.clone()).await?;
            bot.delete_message(chat_id, message.id()).await?;
        }
        Action::Show(target) => {
            // ack first so the client drops the loading spinner
            bot.answer_callback_query(q.id.clone()).await?;

            let (record, template, alt_poster): (_, &str, fn(&str) -> String) = match token.ns {
                Namespace::Imdb => (
                    none_on_error(imdb.title(target).await, "imdb")
                        .map(|t| imdb::detail_record(&t, target)),
                    config.imdb_template.as_str(),
                    imdb::poster_fallback,
                ),
                Namespace::Mdl => (
                    none_on_error(mdl.drama(target).await, "mdl")
                        .map(|d| mdl::detail_record(&d)),
                    config.mdl_template.as_str(),
                    mdl::poster_fallback,
                ),
            };

            let poster = record.as_ref().and_then(|r| r.get("poster").cloned());
            let caption = match &record {
                Some(r) if !template.is_empty() => format::fill_template(template, r),
                _ => "<i>No Data Received</i>".to_string(),
            };

            let kb = keyboard_close(token.ns, token.user_id);
            deliver(&bot, chat_id, &caption, poster.as_deref(), alt_poster, kb).await?;
            // the menu served its purpose
            let _ = bot.delete_message(chat_id, message.id()).await;
        }
    }
    Ok(())
}

/// Send the caption, preferring a photo with the poster attached. A poster
/// fault gets one retry with the alternate URL variant, after which the
/// caption goes out text-only.
async fn deliver(
    bot: &Bot,
    chat: ChatId,
    caption: &str,
    poster: Option<&str>,
    alt_poster: fn(&str) -> String,
    kb: InlineKeyboardMarkup,
) -> ResponseResult<()> {
    if utf16_len(caption) <= CAPTION_LIMIT {
        if let Some(url) = poster {
            let bytes = match fetch_image(url).await {
                Ok(b) => Some(b),
                Err(fault) => {
                    warn!(%url, %fault, "poster fetch failed, trying alternate variant");
                    let alt = alt_poster(url);
                    if alt != url {
                        match fetch_image(&alt).await {
                            Ok(b) => Some(b),
                            Err(fault) => {
                                warn!(url = %alt, %fault, "alternate poster failed, sending text only");
                                None
                            }
                        }
                    } else {
                        None
                    }
                }
            };
            if let Some(bytes) = bytes {
                bot.send_photo(chat, InputFile::memory(bytes).file_name("poster.jpg"))
                    .caption(caption.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(kb)
                    .await?;
                return Ok(());
            }
        }
    }
    bot.send_message(chat, caption)
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await?;
    Ok(())
}

/* ====== Correlation token ====== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Namespace {
    Imdb,
    Mdl,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::Imdb => "imdb",
            Namespace::Mdl => "mdl",
        }
    }

    // wire word of the show action differs per module
    fn show_word(self) -> &'static str {
        match self {
            Namespace::Imdb => "movie",
            Namespace::Mdl => "drama",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Show(String),
    Close,
}

/// Button payload tying a callback back to the issuing user; honored only
/// when the pressing user's id matches `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallbackToken {
    pub ns: Namespace,
    pub user_id: u64,
    pub action: Action,
}

impl CallbackToken {
    fn encode(&self) -> String {
        match &self.action {
            Action::Show(target) => format!(
                "{} {} {} {}",
                self.ns.as_str(),
                self.user_id,
                self.ns.show_word(),
                target
            ),
            Action::Close => format!("{} {} close", self.ns.as_str(), self.user_id),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split_whitespace();
        let ns = match parts.next()? {
            "imdb" => Namespace::Imdb,
            "mdl" => Namespace::Mdl,
            _ => return None,
        };
        let user_id = parts.next()?.parse().ok()?;
        let action = match parts.next()? {
            "close" => Action::Close,
            "movie" | "drama" => Action::Show(parts.next()?.to_string()),
            _ => return None,
        };
        Some(Self { ns, user_id, action })
    }
}

/* ====== Keyboards ====== */

// Telegram rejects the whole keyboard when any callback data exceeds this.
const CALLBACK_DATA_LIMIT: usize = 64;

fn keyboard_results(ns: Namespace, user_id: u64, hits: &[SearchHit]) -> InlineKeyboardMarkup {
    // single column, close row last; hits whose payload would not fit the
    // callback-data limit are dropped rather than poisoning the send
    let mut rows: Vec<Vec<InlineKeyboardButton>> = hits
        .iter()
        .filter_map(|h| {
            let data = CallbackToken {
                ns,
                user_id,
                action: Action::Show(h.id.clone()),
            }
            .encode();
            (data.len() <= CALLBACK_DATA_LIMIT).then(|| {
                vec![InlineKeyboardButton::callback(
                    format!("🎬 {}", h.one_line()),
                    data,
                )]
            })
        })
        .collect();
    rows.push(vec![close_button(ns, user_id)]);
    InlineKeyboardMarkup::new(rows)
}

fn keyboard_close(ns: Namespace, user_id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![close_button(ns, user_id)]])
}

fn close_button(ns: Namespace, user_id: u64) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
        "🚫 Close 🚫",
        CallbackToken {
            ns,
            user_id,
            action: Action::Close,
        }
        .encode(),
    )
}

/* ====== Poster download as bytes (robust against redirects/CDN) ====== */

#[derive(Debug, Error)]
enum ImageFault {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected content-type: {0}")]
    ContentType(String),
    #[error("empty payload")]
    Empty,
}

async fn fetch_image(url: &str) -> Result<Vec<u8>, ImageFault> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent("Mozilla/5.0 (compatible; tg-bot/1.0)")
        .build()?;
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "image/*")
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(ImageFault::Status(resp.status()));
    }
    if let Some(ct) = resp.headers().get(reqwest::header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or("");
        if !ct.starts_with("image/") {
            return Err(ImageFault::ContentType(ct.to_string()));
        }
    }
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Err(ImageFault::Empty);
    }
    Ok(bytes.to_vec())
}

// message lengths the way Telegram counts them
fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/* ====== Lookup failure degradation ======
   A failed API round-trip resolves to "nothing found" so the placeholder
   message always gets its edit and the interaction never stays stuck. */

fn none_on_error<T>(res: Result<Option<T>, LookupError>, backend: &str) -> Option<T> {
    res.unwrap_or_else(|err| {
        warn!(%err, backend, "detail lookup failed, treating as no data");
        None
    })
}

fn empty_on_error(res: Result<Vec<SearchHit>, LookupError>, backend: &str) -> Vec<SearchHit> {
    res.unwrap_or_else(|err| {
        warn!(%err, backend, "search failed, treating as no results");
        vec![]
    })
}
