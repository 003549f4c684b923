//! Feed watcher: polls the watched account and announces new posts.
//!
//! The watcher owns all change-detection state (known ids, baseline, error
//! counter) and is driven by a single task, so none of it is shared or locked.
//!
//! - The first successful poll that returns items only records a baseline; posts
//!   that existed before startup are never announced.
//! - Ids already seen are skipped, so overlapping poll windows announce each
//!   post once.
//! - Rate limiting and other failures back off on separate schedules; a run of
//!   `max_consecutive_errors` failures triggers one extended backoff.

use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    dispatcher::Announcer,
    feed::{FeedError, FeedItemId, FeedSource},
};

#[derive(Clone, Debug)]
pub struct WatcherConfig {
    pub account_id: String,
    pub fetch_limit: usize,
    pub poll_interval: Duration,
    pub rate_limit_delay: Duration,
    pub error_delay: Duration,
    pub extended_error_delay: Duration,
    pub max_consecutive_errors: u32,
}

impl From<&Config> for WatcherConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            account_id: cfg.twitter_user_id.clone(),
            fetch_limit: cfg.fetch_limit,
            poll_interval: cfg.poll_interval,
            rate_limit_delay: cfg.rate_limit_delay,
            error_delay: cfg.error_delay,
            extended_error_delay: cfg.extended_error_delay,
            max_consecutive_errors: cfg.max_consecutive_errors,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    /// No baseline yet; discovered ids are recorded but not announced.
    Uninitialized,
    Tracking,
    BackoffRateLimited,
    BackoffError,
}

/// What one poll did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// First non-empty poll: ids recorded, nothing announced.
    Baselined { baseline: FeedItemId, recorded: usize },
    /// Feed returned nothing.
    Empty,
    NoChange,
    /// New ids announced, in the order the feed returned them.
    Announced(Vec<FeedItemId>),
    RateLimited,
    /// Non-rate-limit failure. `circuit_open` is set when this failure hit the
    /// consecutive-error threshold and the extended delay applies.
    Failed { consecutive: u32, circuit_open: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// How long to sleep before the next poll.
    pub next_delay: Duration,
}

pub struct FeedWatcher {
    cfg: WatcherConfig,
    feed: Arc<dyn FeedSource>,
    announcer: Arc<dyn Announcer>,
    known_ids: HashSet<FeedItemId>,
    baseline: Option<FeedItemId>,
    consecutive_errors: u32,
    state: WatcherState,
}

impl FeedWatcher {
    pub fn new(
        cfg: WatcherConfig,
        feed: Arc<dyn FeedSource>,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        Self {
            cfg,
            feed,
            announcer,
            known_ids: HashSet::new(),
            baseline: None,
            consecutive_errors: 0,
            state: WatcherState::Uninitialized,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn baseline(&self) -> Option<&FeedItemId> {
        self.baseline.as_ref()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn is_known(&self, id: &FeedItemId) -> bool {
        self.known_ids.contains(id)
    }

    pub fn known_count(&self) -> usize {
        self.known_ids.len()
    }

    /// Run one poll cycle, including every announce it triggers.
    pub async fn poll_once(&mut self) -> PollReport {
        let items = match self
            .feed
            .fetch_recent(&self.cfg.account_id, self.cfg.fetch_limit)
            .await
        {
            Ok(items) => items,
            Err(FeedError::RateLimited) => {
                self.state = WatcherState::BackoffRateLimited;
                warn!(
                    delay_secs = self.cfg.rate_limit_delay.as_secs(),
                    "feed rate limited; backing off"
                );
                return PollReport {
                    outcome: PollOutcome::RateLimited,
                    next_delay: self.cfg.rate_limit_delay,
                };
            }
            Err(FeedError::Fetch(e)) => return self.record_failure(&e),
        };

        self.consecutive_errors = 0;

        let baselined = self.baseline.is_some();
        let mut announced = Vec::new();
        let mut recorded = 0usize;

        for item in &items {
            if !self.known_ids.insert(item.id.clone()) {
                continue;
            }
            recorded += 1;
            if !baselined {
                continue;
            }

            info!(id = %item.id, url = %item.url, "new post detected");
            let report = self.announcer.announce(&item.url).await;
            if report.all_failed() {
                error!(id = %item.id, delivered = %report.summary(), "announcement reached no destination");
            }
            announced.push(item.id.clone());
        }

        let outcome = match (baselined, items.first()) {
            (false, Some(latest)) => {
                self.baseline = Some(latest.id.clone());
                info!(baseline = %latest.id, recorded, "baseline established; existing posts will not be announced");
                PollOutcome::Baselined {
                    baseline: latest.id.clone(),
                    recorded,
                }
            }
            (_, None) => {
                debug!("feed returned no posts");
                PollOutcome::Empty
            }
            (true, Some(_)) if announced.is_empty() => {
                debug!("no new posts");
                PollOutcome::NoChange
            }
            (true, Some(_)) => PollOutcome::Announced(announced),
        };

        self.state = if self.baseline.is_some() {
            WatcherState::Tracking
        } else {
            WatcherState::Uninitialized
        };

        PollReport {
            outcome,
            next_delay: self.cfg.poll_interval,
        }
    }

    fn record_failure(&mut self, reason: &str) -> PollReport {
        self.state = WatcherState::BackoffError;
        self.consecutive_errors += 1;
        let consecutive = self.consecutive_errors;

        if consecutive >= self.cfg.max_consecutive_errors {
            self.consecutive_errors = 0;
            error!(
                consecutive,
                error = reason,
                delay_secs = self.cfg.extended_error_delay.as_secs(),
                "too many consecutive feed errors; extended backoff"
            );
            return PollReport {
                outcome: PollOutcome::Failed {
                    consecutive,
                    circuit_open: true,
                },
                next_delay: self.cfg.extended_error_delay,
            };
        }

        warn!(
            consecutive,
            error = reason,
            delay_secs = self.cfg.error_delay.as_secs(),
            "feed fetch failed"
        );
        PollReport {
            outcome: PollOutcome::Failed {
                consecutive,
                circuit_open: false,
            },
            next_delay: self.cfg.error_delay,
        }
    }

    /// Poll until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            account = %self.cfg.account_id,
            interval_secs = self.cfg.poll_interval.as_secs(),
            "feed watcher started"
        );
        loop {
            let report = tokio::select! {
              _ = cancel.cancelled() => break,
              report = self.poll_once() => report,
            };
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = sleep(report.next_delay) => {}
            }
        }
        info!("feed watcher stopped");
    }
}
