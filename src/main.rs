use dotenvy::dotenv;
use teloxide::prelude::*;
use tg_title_lookup::{config, imdb, mdl, tg};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bot = Bot::from_env();
    let config = config::Config::from_env();
    let imdb = imdb::ImdbClient::new();
    let mdl = mdl::MdlClient::new();

    tracing::info!("starting title lookup bot");
    tg::run(bot, imdb, mdl, config).await;
    Ok(())
}
