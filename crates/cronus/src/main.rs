use std::sync::Arc;

use serenity::http::Http;

use cronus_core::{
    bot::SupportBot,
    config::Config,
    issues::{IssueLinkTemplate, IssueLookup, RetryPolicy},
    messaging::port::MessagingPort,
    tags::{TagService, TagStore},
};
use cronus_discord::DiscordMessenger;
use cronus_mongo::MongoTagStore;
use cronus_sentry::SentryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cronus_core::logging::init("cronus")?;

    let cfg = Arc::new(Config::load()?);

    let store = MongoTagStore::connect(&cfg.mongo_uri, &cfg.mongo_database).await?;
    if let Err(e) = store.ensure_indexes().await {
        tracing::warn!(error = %e, "failed to ensure tag indexes");
    }
    let tags = TagService::new(Arc::new(store));

    let issues = IssueLookup::new(
        Arc::new(SentryClient::new(&cfg.sentry)?),
        RetryPolicy::default(),
        IssueLinkTemplate(cfg.sentry.issue_url_template.clone()),
    );

    let http = Arc::new(Http::new(&cfg.discord_token));
    let messenger: Arc<dyn MessagingPort> = Arc::new(DiscordMessenger::new(http));

    let bot = Arc::new(SupportBot::new(cfg.clone(), messenger, tags, issues));

    cronus_discord::router::run_gateway(cfg, bot).await
}
