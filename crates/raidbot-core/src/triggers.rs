//! Manual raid triggers: the `/raid` command and pasted post links.
//!
//! Both go straight to the announcer and do not consult the watcher's known
//! ids, so a post can be raided again after the watcher announced it.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    cooldown::Cooldown,
    dispatcher::{Announcer, DispatchReport},
    domain::UserId,
    feed::{FeedError, FeedSource},
};

pub const LINK_FORMAT_HINT: &str = "https://x.com/<user>/status/<id>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaidOutcome {
    Announced { url: String, report: DispatchReport },
    /// Feed worked but the account has no posts.
    NoPost,
    FeedUnavailable(FeedError),
    Throttled(Duration),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasteOutcome {
    Announced { url: String, report: DispatchReport },
    Rejected,
    Throttled(Duration),
}

impl RaidOutcome {
    pub fn reply_text(&self) -> String {
        match self {
            RaidOutcome::Announced { report, .. } => delivery_reply(report),
            RaidOutcome::NoPost | RaidOutcome::FeedUnavailable(_) => {
                "Could not fetch the latest tweet.".to_string()
            }
            RaidOutcome::Throttled(wait) => throttled_reply(*wait),
        }
    }
}

impl PasteOutcome {
    pub fn reply_text(&self) -> String {
        match self {
            PasteOutcome::Announced { report, .. } => delivery_reply(report),
            PasteOutcome::Rejected => format!(
                "That doesn't look like a tweet link. Send a link like {LINK_FORMAT_HINT}"
            ),
            PasteOutcome::Throttled(wait) => throttled_reply(*wait),
        }
    }
}

fn delivery_reply(report: &DispatchReport) -> String {
    if report.all_failed() {
        "Raid failed: no destination could be reached.".to_string()
    } else {
        format!("🚀 Raid sent to {} destinations.", report.summary())
    }
}

fn throttled_reply(wait: Duration) -> String {
    format!("Slow down! Try again in {}s.", wait.as_secs().max(1))
}

fn status_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"https?://(?:www\.|mobile\.)?(?:x|twitter)\.com/(?:i/web|[A-Za-z0-9_]{1,15})/status/[0-9]+\b",
        )
        .expect("status link regex")
    })
}

/// First post link in `text`, without trailing query or punctuation.
pub fn extract_status_url(text: &str) -> Option<String> {
    status_link_re()
        .find(text)
        .map(|m| m.as_str().to_string())
}

pub struct ManualTriggers {
    feed: Arc<dyn FeedSource>,
    announcer: Arc<dyn Announcer>,
    account_id: String,
    fetch_limit: usize,
    cooldown: Mutex<Cooldown>,
}

impl ManualTriggers {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        announcer: Arc<dyn Announcer>,
        account_id: impl Into<String>,
        fetch_limit: usize,
        cooldown: Cooldown,
    ) -> Self {
        Self {
            feed,
            announcer,
            account_id: account_id.into(),
            fetch_limit,
            cooldown: Mutex::new(cooldown),
        }
    }

    async fn acquire(&self, user: UserId) -> Result<(), Duration> {
        self.cooldown.lock().await.try_acquire(user)
    }

    /// Announce the account's latest post.
    ///
    /// A token is only spent once there is a post to announce; a throttled
    /// user is turned away before the feed is queried.
    pub async fn raid_latest(&self, user: UserId) -> RaidOutcome {
        let allowed = self.cooldown.lock().await.check(user);
        if let Err(wait) = allowed {
            info!(user = user.0, wait_secs = wait.as_secs(), "manual raid throttled");
            return RaidOutcome::Throttled(wait);
        }

        let items = match self
            .feed
            .fetch_recent(&self.account_id, self.fetch_limit)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "manual raid could not fetch the feed");
                return RaidOutcome::FeedUnavailable(e);
            }
        };

        let Some(latest) = items.into_iter().next() else {
            info!("manual raid: no posts found");
            return RaidOutcome::NoPost;
        };

        if let Err(wait) = self.acquire(user).await {
            info!(user = user.0, wait_secs = wait.as_secs(), "manual raid throttled");
            return RaidOutcome::Throttled(wait);
        }

        info!(user = user.0, url = %latest.url, "manual raid");
        let report = self.announcer.announce(&latest.url).await;
        RaidOutcome::Announced {
            url: latest.url,
            report,
        }
    }

    /// Announce a post link pasted by a user.
    pub async fn raid_from_text(&self, user: UserId, text: &str) -> PasteOutcome {
        let Some(url) = extract_status_url(text) else {
            return PasteOutcome::Rejected;
        };

        if let Err(wait) = self.acquire(user).await {
            info!(user = user.0, wait_secs = wait.as_secs(), "pasted link raid throttled");
            return PasteOutcome::Throttled(wait);
        }

        info!(user = user.0, url = %url, "pasted link raid");
        let report = self.announcer.announce(&url).await;
        PasteOutcome::Announced { url, report }
    }
}
