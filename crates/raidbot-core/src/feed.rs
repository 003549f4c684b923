//! Feed source port and the items it yields.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Stable id of a post on the watched account.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeedItemId(pub String);

impl fmt::Display for FeedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeedItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedItem {
    pub id: FeedItemId,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub url: String,
}

impl FeedItem {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        let id = FeedItemId(id.into());
        let url = status_url(&id);
        Self {
            id,
            created_at,
            text: text.into(),
            url,
        }
    }
}

/// Canonical link for a post id.
pub fn status_url(id: &FeedItemId) -> String {
    format!("https://twitter.com/i/web/status/{}", id.0)
}

/// Feed failures, split so callers must handle throttling separately.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("rate limited")]
    RateLimited,

    #[error("{0}")]
    Fetch(String),
}

/// Port for the social feed being watched.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Return up to `limit` most recent items, newest first.
    async fn fetch_recent(
        &self,
        account_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<FeedItem>, FeedError>;
}
