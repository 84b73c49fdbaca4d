//! Error-tracker lookups.
//!
//! The tracker indexes events asynchronously, so a freshly reported error id
//! may not be searchable yet. `IssueLookup` polls a few times with growing
//! delays and keeps the user informed by editing a single status message.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::{
    domain::MessageRef,
    messaging::{
        port::MessagingPort,
        types::{Embed, OutgoingMessage},
    },
    Result,
};

/// The subset of an issue record the bot renders.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: IssueMetadata,
    #[serde(default)]
    pub is_unhandled: Option<bool>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct IssueMetadata {
    #[serde(default)]
    pub value: Option<String>,
}

/// Port for the error-tracking service.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Issues matching `error_id`, most relevant first. An empty list means
    /// the event is not (yet) indexed.
    async fn find_issues(&self, error_id: &str) -> Result<Vec<Issue>>;
}

/// Bounded exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_interval: Duration::from_secs(2),
            factor: 1.3,
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed `attempt` (1-based): `initial * factor^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        self.initial_interval.mul_f64(self.factor.powi(exp))
    }
}

/// Browser link for an issue, built from a `{issue_id}` template.
#[derive(Clone, Debug)]
pub struct IssueLinkTemplate(pub String);

impl IssueLinkTemplate {
    pub fn url_for(&self, issue_id: &str) -> Option<String> {
        if issue_id.trim().is_empty() {
            return None;
        }
        Some(self.0.replace("{issue_id}", issue_id))
    }
}

/// Display-ready view of the first matching issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueSummary {
    pub title: String,
    pub value: String,
    pub unhandled: String,
    pub last_seen: String,
    pub url: String,
}

impl IssueSummary {
    pub fn from_issue(issue: &Issue, links: &IssueLinkTemplate) -> Self {
        let title = issue
            .title
            .clone()
            .unwrap_or_else(|| "Title not available".to_string());
        let value = issue
            .metadata
            .value
            .clone()
            .unwrap_or_else(|| "Value not available".to_string());
        let unhandled = match issue.is_unhandled {
            Some(true) => "True".to_string(),
            Some(false) => "False".to_string(),
            None => "Handled information not available".to_string(),
        };
        let last_seen = issue
            .last_seen
            .as_deref()
            .map(relative_timestamp)
            .unwrap_or_else(|| "Last seen not available".to_string());
        let url = issue
            .id
            .as_deref()
            .and_then(|id| links.url_for(id))
            .unwrap_or_else(|| {
                tracing::warn!("issue has no usable id, cannot build a link");
                "URL not available".to_string()
            });

        Self {
            title,
            value,
            unhandled,
            last_seen,
            url,
        }
    }

    pub fn to_embed(&self) -> Embed {
        Embed::new()
            .title(format!("Sentry Issue: {}", self.title))
            .field("Value", &self.value, false)
            .field("Unhandled", &self.unhandled, false)
            .field("Last Seen", &self.last_seen, false)
            .field("Sentry URL", &self.url, false)
    }
}

/// Render an ISO-8601 timestamp as a Discord relative timestamp (`<t:unix:R>`).
/// Unparseable input is shown verbatim.
pub fn relative_timestamp(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => format!("<t:{}:R>", dt.timestamp()),
        Err(_) => iso.to_string(),
    }
}

pub fn retrying_text(error_id: &str, delay: Duration) -> String {
    format!(
        "No matching issues found for error ID: {error_id}... **Retrying in {:.2} seconds**.",
        delay.as_secs_f64()
    )
}

pub fn exhausted_text(error_id: &str) -> String {
    format!("No matching issues found for error ID: {error_id} after all attempts.")
}

/// Polls the tracker and renders the outcome into a status message.
pub struct IssueLookup {
    tracker: Arc<dyn IssueTracker>,
    policy: RetryPolicy,
    links: IssueLinkTemplate,
}

impl IssueLookup {
    pub fn new(tracker: Arc<dyn IssueTracker>, policy: RetryPolicy, links: IssueLinkTemplate) -> Self {
        Self {
            tracker,
            policy,
            links,
        }
    }

    /// Returns whether an issue was found. `status` is edited in place.
    pub async fn run(
        &self,
        messenger: &dyn MessagingPort,
        status: MessageRef,
        error_id: &str,
    ) -> Result<bool> {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.tracker.find_issues(error_id).await {
                Ok(issues) => {
                    if let Some(first) = issues.first() {
                        let summary = IssueSummary::from_issue(first, &self.links);
                        tracing::info!(error_id, attempt, title = %summary.title, "issue found");
                        let mut update = OutgoingMessage::embed(summary.to_embed());
                        update.content = None;
                        messenger.edit(status, update).await?;
                        return Ok(true);
                    }
                    tracing::debug!(error_id, attempt, "no issues in response");
                }
                Err(e) => {
                    tracing::warn!(error_id, attempt, error = %e, "issue lookup failed");
                }
            }

            if attempt < attempts {
                let delay = self.policy.delay_for(attempt);
                messenger
                    .edit(status, OutgoingMessage::text(retrying_text(error_id, delay)))
                    .await?;
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!(error_id, "no matching issues found after all attempts");
        messenger
            .edit(status, OutgoingMessage::text(exhausted_text(error_id)))
            .await?;
        Ok(false)
    }
}
