//! X (Twitter) adapter.
//!
//! Implements the core `FeedSource` port over the API v2 user timeline
//! endpoint (`GET /2/users/:id/tweets`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use raidbot_core::feed::{FeedError, FeedItem, FeedSource};

/// API bounds for `max_results` on the user timeline endpoint.
const MIN_RESULTS: usize = 5;
const MAX_RESULTS: usize = 100;

#[derive(Clone, Debug)]
pub struct TwitterClient {
    bearer_token: String,
    base_url: String,
    exclude_replies: bool,
    http: reqwest::Client,
}

impl TwitterClient {
    pub fn new(bearer_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client build");
        Self {
            bearer_token: bearer_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            exclude_replies: true,
            http,
        }
    }

    pub fn with_replies(mut self, include: bool) -> Self {
        self.exclude_replies = !include;
        self
    }

    fn timeline_url(&self, account_id: &str) -> String {
        format!("{}/2/users/{account_id}/tweets", self.base_url)
    }

    fn query(&self, limit: usize) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("max_results", clamp_limit(limit).to_string()),
            ("tweet.fields", "id,text,created_at".to_string()),
        ];
        if self.exclude_replies {
            q.push(("exclude", "replies".to_string()));
        }
        q
    }
}

#[async_trait]
impl FeedSource for TwitterClient {
    async fn fetch_recent(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<FeedItem>, FeedError> {
        let resp = self
            .http
            .get(self.timeline_url(account_id))
            .bearer_auth(&self.bearer_token)
            .query(&self.query(limit))
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("x api request error: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let reset = resp
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug!(reset = reset.as_deref().unwrap_or("unknown"), "x api rate limit hit");
            return Err(FeedError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Fetch(format!(
                "x api timeline failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Fetch(format!("x api body error: {e}")))?;
        let mut items = parse_timeline(&body)?;
        items.truncate(limit);
        Ok(items)
    }
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_RESULTS, MAX_RESULTS)
}

#[derive(Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    created_at: Option<String>,
}

/// Parse a timeline response body, newest first as the API returns it.
///
/// A body with no `data` is an empty timeline. Tweets without a parseable
/// `created_at` are skipped.
pub fn parse_timeline(body: &str) -> Result<Vec<FeedItem>, FeedError> {
    let resp: TimelineResponse = serde_json::from_str(body)
        .map_err(|e| FeedError::Fetch(format!("x api json error: {e}")))?;

    let mut out = Vec::with_capacity(resp.data.len());
    for tweet in resp.data {
        let created_at = tweet
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let Some(created_at) = created_at else {
            warn!(id = %tweet.id, "skipping tweet without a valid created_at");
            continue;
        };
        out.push(FeedItem::new(tweet.id, created_at, tweet.text));
    }
    Ok(out)
}
