//! Sentry adapter (issue search by error id).
//!
//! Uses the `projects/{org}/{project}/issues/` endpoint with an
//! `error_id:<id>` query.

use async_trait::async_trait;

use cronus_core::{
    config::SentryConfig,
    errors::Error,
    issues::{Issue, IssueTracker},
    Result,
};

#[derive(Clone, Debug)]
pub struct SentryClient {
    issues_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SentryClient {
    pub fn new(cfg: &SentryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| Error::External(format!("sentry client build error: {e}")))?;
        Ok(Self {
            issues_url: issues_url(cfg),
            api_key: cfg.api_key.clone(),
            http,
        })
    }

    pub fn issues_url(&self) -> &str {
        &self.issues_url
    }
}

fn issues_url(cfg: &SentryConfig) -> String {
    format!(
        "{}/projects/{}/{}/issues/",
        cfg.api_url.trim_end_matches('/'),
        cfg.organization_slug,
        cfg.project_slug
    )
}

fn search_query(error_id: &str) -> String {
    format!("error_id:{error_id}")
}

/// Decode the issue list. Anything other than a JSON array is an error.
fn parse_issues(body: serde_json::Value) -> Result<Vec<Issue>> {
    if !body.is_array() {
        return Err(Error::External(format!(
            "sentry returned unexpected payload: {}",
            body.to_string().chars().take(200).collect::<String>()
        )));
    }
    serde_json::from_value(body).map_err(Error::Json)
}

#[async_trait]
impl IssueTracker for SentryClient {
    async fn find_issues(&self, error_id: &str) -> Result<Vec<Issue>> {
        let resp = self
            .http
            .get(&self.issues_url)
            .bearer_auth(&self.api_key)
            .query(&[("query", search_query(error_id))])
            .send()
            .await
            .map_err(|e| Error::External(format!("sentry request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "sentry issue search failed");
            return Err(Error::External(format!(
                "sentry issue search failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("sentry json error: {e}")))?;
        tracing::debug!(error_id, payload = %body, "sentry issues received");

        parse_issues(body)
    }
}
