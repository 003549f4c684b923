use std::{env, path::PathBuf, time::Duration};

use tracing::{debug, warn};

use crate::{domain::Destination, errors::Error, Result};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub twitter_bearer_token: String,

    // Feed
    pub twitter_user_id: String,
    pub twitter_api_base: String,
    pub fetch_limit: usize,

    // Fan-out
    pub destinations: Vec<Destination>,
    pub raid_image_path: Option<PathBuf>,

    // Watcher timing
    pub poll_interval: Duration,
    pub rate_limit_delay: Duration,
    pub error_delay: Duration,
    pub extended_error_delay: Duration,
    pub max_consecutive_errors: u32,

    // Manual trigger cooldown
    pub raid_cooldown_enabled: bool,
    pub raid_cooldown_requests: u32,
    pub raid_cooldown_window: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "failed to read .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = require(get("TELEGRAM_BOT_TOKEN"), "TELEGRAM_BOT_TOKEN")?;
        let twitter_bearer_token =
            require(get("TWITTER_BEARER_TOKEN"), "TWITTER_BEARER_TOKEN")?;
        let twitter_user_id = require(get("TWITTER_USER_ID"), "TWITTER_USER_ID")?;
        let twitter_api_base = get("TWITTER_API_BASE")
            .unwrap_or_else(|| "https://api.twitter.com".to_string())
            .trim_end_matches('/')
            .to_string();

        // RAID_DESTINATIONS first, then the single-chat variables.
        let mut raw_destinations = parse_csv(get("RAID_DESTINATIONS"));
        raw_destinations.extend(get("CHANNEL_ID"));
        raw_destinations.extend(get("GROUP_CHAT_ID"));
        let destinations = parse_destinations(&raw_destinations);
        if destinations.is_empty() {
            return Err(Error::Config(
                "at least one destination is required (RAID_DESTINATIONS, CHANNEL_ID or GROUP_CHAT_ID)"
                    .to_string(),
            ));
        }

        let raid_image_path = match lookup("RAID_IMAGE_PATH") {
            Some(p) if p.trim().is_empty() => None,
            Some(p) => Some(PathBuf::from(p.trim())),
            None => Some(PathBuf::from("bot/raidBot.png")),
        };

        let poll_interval = secs(parse_num(get("POLL_INTERVAL_SECS"), "POLL_INTERVAL_SECS")?, 60);
        if poll_interval.is_zero() {
            return Err(Error::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let rate_limit_delay = secs(
            parse_num(get("RATE_LIMIT_DELAY_SECS"), "RATE_LIMIT_DELAY_SECS")?,
            120,
        );
        let error_delay = secs(parse_num(get("ERROR_DELAY_SECS"), "ERROR_DELAY_SECS")?, 60);
        let extended_error_delay = secs(
            parse_num(get("EXTENDED_ERROR_DELAY_SECS"), "EXTENDED_ERROR_DELAY_SECS")?,
            600,
        );
        let max_consecutive_errors =
            parse_num::<u32>(get("MAX_CONSECUTIVE_ERRORS"), "MAX_CONSECUTIVE_ERRORS")?
                .unwrap_or(5)
                .max(1);
        let fetch_limit = parse_num::<usize>(get("FETCH_LIMIT"), "FETCH_LIMIT")?
            .unwrap_or(5)
            .max(1);

        let raid_cooldown_enabled = parse_bool(get("RAID_COOLDOWN_ENABLED")).unwrap_or(true);
        let raid_cooldown_requests =
            parse_num::<u32>(get("RAID_COOLDOWN_REQUESTS"), "RAID_COOLDOWN_REQUESTS")?
                .unwrap_or(3);
        let raid_cooldown_window = secs(
            parse_num(get("RAID_COOLDOWN_WINDOW_SECS"), "RAID_COOLDOWN_WINDOW_SECS")?,
            60,
        );

        Ok(Self {
            telegram_bot_token,
            twitter_bearer_token,
            twitter_user_id,
            twitter_api_base,
            fetch_limit,
            destinations,
            raid_image_path,
            poll_interval,
            rate_limit_delay,
            error_delay,
            extended_error_delay,
            max_consecutive_errors,
            raid_cooldown_enabled,
            raid_cooldown_requests,
            raid_cooldown_window,
        })
    }
}

/// Parse destination entries, dropping empty/zero entries and duplicates.
pub fn parse_destinations(raw: &[String]) -> Vec<Destination> {
    let mut out: Vec<Destination> = Vec::new();
    for d in raw.iter().filter_map(|s| Destination::parse(s)) {
        if !out.contains(&d) {
            out.push(d);
        }
    }
    out
}

fn require(v: Option<String>, key: &str) -> Result<String> {
    v.ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_num<T: std::str::FromStr>(v: Option<String>, key: &str) -> Result<Option<T>> {
    let Some(s) = v else {
        return Ok(None);
    };
    s.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {s:?}")))
}

fn secs(v: Option<u64>, default: u64) -> Duration {
    Duration::from_secs(v.unwrap_or(default))
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
