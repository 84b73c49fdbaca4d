use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    domain::{ChannelId, RoleId},
    errors::Error,
    Result,
};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_ISSUE_URL_TEMPLATE: &str =
    "https://ermcorporation.sentry.io/issues/{issue_id}/?environment=production&project=5919400";

const DEFAULT_MODERATOR_ROLE_ID: u64 = 988_055_417_907_200_010;
const DEFAULT_REPORT_CHANNEL_ID: u64 = 988_056_281_900_257_300;

/// Issue tracker endpoint and credentials.
#[derive(Clone, Debug)]
pub struct SentryConfig {
    pub api_url: String,
    pub api_key: String,
    pub organization_slug: String,
    pub project_slug: String,
    /// Browser link for an issue; `{issue_id}` is substituted.
    pub issue_url_template: String,
    pub request_timeout: Duration,
}

/// Typed configuration for the bot.
///
/// Secrets and ids come from the environment (`.env` is honoured); the issue
/// tracker settings come from the JSON config file, with env overrides.
#[derive(Clone, Debug)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,
    pub presence: String,

    // Storage
    pub mongo_uri: String,
    pub mongo_database: String,

    // Issue tracker
    pub sentry: SentryConfig,

    // Roles / channels
    pub support_role_name: String,
    pub moderator_role_id: RoleId,
    pub report_channel_id: ChannelId,
    pub report_ping_role_id: Option<RoleId>,

    // Timers
    pub reaction_cooldown: Duration,
    pub report_cooldown: Duration,
    pub paginator_timeout: Duration,
}

/// Shape of `config.json`. Keys keep the upper-case names used by existing deployments.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(rename = "SENTRY_API_URL")]
    pub sentry_api_url: Option<String>,
    #[serde(rename = "SENTRY_API_KEY")]
    pub sentry_api_key: Option<String>,
    #[serde(rename = "SENTRY_ORGANIZATION_SLUG")]
    pub sentry_organization_slug: Option<String>,
    #[serde(rename = "PROJECT_SLUG")]
    pub project_slug: Option<String>,
    #[serde(rename = "SENTRY_ISSUE_URL_TEMPLATE")]
    pub sentry_issue_url_template: Option<String>,
}

impl FileConfig {
    /// Read the JSON config file. A missing file yields an empty config so
    /// every value can still come from the environment.
    pub fn read(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(txt) => Ok(serde_json::from_str(&txt)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using environment only");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Does not override variables that are already set.
        if let Some(e) = dotenv_problem(dotenvy::dotenv()) {
            tracing::warn!(error = %e, "failed to load .env");
        }

        let path = env_path("CONFIG_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = FileConfig::read(&path)?;
        let cfg = Self::from_sources(file, &|key| env::var(key).ok())?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Build the config from a parsed file and an environment lookup.
    pub fn from_sources(file: FileConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| env(key).and_then(non_empty);

        let discord_token = required(lookup("TOKEN"), "TOKEN")?;
        let mongo_uri = required(lookup("MONGO_URI"), "MONGO_URI")?;
        let mongo_database = lookup("MONGO_DATABASE").unwrap_or_else(|| "Cronus".to_string());

        let command_prefix = lookup("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string());
        let presence = lookup("BOT_PRESENCE").unwrap_or_else(|| "with ERM Systems".to_string());

        // File values first, env overrides.
        let pick = |key: &str, from_file: Option<String>| lookup(key).or(from_file.and_then(non_empty));
        let sentry = SentryConfig {
            api_url: required(pick("SENTRY_API_URL", file.sentry_api_url), "SENTRY_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            api_key: required(pick("SENTRY_API_KEY", file.sentry_api_key), "SENTRY_API_KEY")?,
            organization_slug: required(
                pick("SENTRY_ORGANIZATION_SLUG", file.sentry_organization_slug),
                "SENTRY_ORGANIZATION_SLUG",
            )?,
            project_slug: required(pick("PROJECT_SLUG", file.project_slug), "PROJECT_SLUG")?,
            issue_url_template: pick("SENTRY_ISSUE_URL_TEMPLATE", file.sentry_issue_url_template)
                .unwrap_or_else(|| DEFAULT_ISSUE_URL_TEMPLATE.to_string()),
            request_timeout: Duration::from_secs(
                parse_u64(lookup("SENTRY_TIMEOUT_SECS"), "SENTRY_TIMEOUT_SECS")?.unwrap_or(10),
            ),
        };

        let support_role_name = lookup("SUPPORT_ROLE_NAME").unwrap_or_else(|| "Support".to_string());
        let moderator_role_id = RoleId(
            parse_u64(lookup("MODERATOR_ROLE_ID"), "MODERATOR_ROLE_ID")?
                .unwrap_or(DEFAULT_MODERATOR_ROLE_ID),
        );
        let report_channel_id = ChannelId(
            parse_u64(lookup("REPORT_CHANNEL_ID"), "REPORT_CHANNEL_ID")?
                .unwrap_or(DEFAULT_REPORT_CHANNEL_ID),
        );
        let report_ping_role_id =
            parse_u64(lookup("REPORT_PING_ROLE_ID"), "REPORT_PING_ROLE_ID")?.map(RoleId);

        let reaction_cooldown = Duration::from_secs(
            parse_u64(lookup("REACTION_COOLDOWN_SECS"), "REACTION_COOLDOWN_SECS")?.unwrap_or(120),
        );
        let report_cooldown = Duration::from_secs(
            parse_u64(lookup("REPORT_COOLDOWN_SECS"), "REPORT_COOLDOWN_SECS")?.unwrap_or(20 * 60),
        );
        let paginator_timeout = Duration::from_secs(
            parse_u64(lookup("PAGINATOR_TIMEOUT_SECS"), "PAGINATOR_TIMEOUT_SECS")?.unwrap_or(180),
        );

        Ok(Self {
            discord_token,
            command_prefix,
            presence,
            mongo_uri,
            mongo_database,
            sentry,
            support_role_name,
            moderator_role_id,
            report_channel_id,
            report_ping_role_id,
            reaction_cooldown,
            report_cooldown,
            paginator_timeout,
        })
    }
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_problem(res: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match res {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value.ok_or_else(|| Error::Config(format!("{key} is required")))
}

fn parse_u64(value: Option<String>, key: &str) -> Result<Option<u64>> {
    value
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("{key} must be an unsigned integer, got {s:?}")))
        })
        .transpose()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
