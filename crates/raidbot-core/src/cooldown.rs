use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::domain::UserId;

/// Per-user token bucket for manual raids.
///
/// Each user holds up to `max_tokens`; one manual raid spends one token and
/// tokens refill continuously over `window`. A bucket left alone for a whole
/// window is full again, so it is forgotten.
#[derive(Clone, Debug)]
pub struct Cooldown {
    enabled: bool,
    max_tokens: f64,
    window: Duration,
    refill_per_sec: f64,
    buckets: HashMap<UserId, Bucket>,
}

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

impl Cooldown {
    pub fn new(enabled: bool, max_tokens: u32, window: Duration) -> Self {
        let max_tokens = f64::from(max_tokens.max(1));
        let window_secs = window.as_secs_f64().max(1e-9);
        Self {
            enabled,
            max_tokens,
            window,
            refill_per_sec: max_tokens / window_secs,
            buckets: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 1, Duration::from_secs(1))
    }

    /// Spend one token. `Err` carries how long until the next token.
    pub fn try_acquire(&mut self, user: UserId) -> Result<(), Duration> {
        self.try_acquire_at(user, Instant::now())
    }

    /// Whether `user` could spend a token right now, without spending it.
    pub fn check(&self, user: UserId) -> Result<(), Duration> {
        self.check_at(user, Instant::now())
    }

    pub fn check_at(&self, user: UserId, now: Instant) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }
        match self.buckets.get(&user) {
            Some(bucket) => self.wait_for(self.refilled(bucket, now)),
            None => Ok(()),
        }
    }

    pub fn try_acquire_at(&mut self, user: UserId, now: Instant) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }

        let window = self.window;
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.last_update) < window);

        let tokens = match self.buckets.get(&user) {
            Some(bucket) => self.refilled(bucket, now),
            None => self.max_tokens,
        };
        let result = self.wait_for(tokens);
        let tokens = if result.is_ok() { tokens - 1.0 } else { tokens };
        self.buckets.insert(
            user,
            Bucket {
                tokens,
                last_update: now,
            },
        );
        result
    }

    /// Users currently holding a partially spent bucket.
    pub fn tracked_users(&self) -> usize {
        self.buckets.len()
    }

    fn refilled(&self, bucket: &Bucket, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(bucket.last_update).as_secs_f64();
        (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens)
    }

    fn wait_for(&self, tokens: f64) -> Result<(), Duration> {
        if tokens >= 1.0 {
            return Ok(());
        }
        let secs = (1.0 - tokens) / self.refill_per_sec;
        Err(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_empties_then_refills() {
        let mut cd = Cooldown::new(true, 2, Duration::from_secs(10));
        let user = UserId(7);
        let t0 = Instant::now();

        assert!(cd.try_acquire_at(user, t0).is_ok());
        assert!(cd.try_acquire_at(user, t0).is_ok());
        let wait = cd.try_acquire_at(user, t0).unwrap_err();
        assert!(wait > Duration::from_secs(4) && wait < Duration::from_secs(6));

        assert!(cd.try_acquire_at(user, t0 + Duration::from_secs(6)).is_ok());
    }

    #[test]
    fn users_have_separate_buckets() {
        let mut cd = Cooldown::new(true, 1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(cd.try_acquire_at(UserId(1), t0).is_ok());
        assert!(cd.try_acquire_at(UserId(1), t0).is_err());
        assert!(cd.try_acquire_at(UserId(2), t0).is_ok());
    }

    #[test]
    fn disabled_never_throttles() {
        let mut cd = Cooldown::disabled();
        let t0 = Instant::now();
        for _ in 0..10 {
            assert!(cd.try_acquire_at(UserId(1), t0).is_ok());
        }
    }

    #[test]
    fn check_does_not_spend() {
        let mut cd = Cooldown::new(true, 1, Duration::from_secs(60));
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(cd.check_at(UserId(1), t0).is_ok());
        }
        assert!(cd.try_acquire_at(UserId(1), t0).is_ok());
        assert!(cd.check_at(UserId(1), t0).is_err());
    }

    #[test]
    fn idle_users_are_forgotten_after_a_window() {
        let mut cd = Cooldown::new(true, 1, Duration::from_secs(60));
        let t0 = Instant::now();
        for id in 0..50 {
            assert!(cd.try_acquire_at(UserId(id), t0).is_ok());
        }
        assert_eq!(cd.tracked_users(), 50);

        let later = t0 + Duration::from_secs(61);
        assert!(cd.try_acquire_at(UserId(1000), later).is_ok());
        assert_eq!(cd.tracked_users(), 1);
        // A forgotten user starts again with a full bucket.
        assert!(cd.try_acquire_at(UserId(0), later).is_ok());
    }
}
