use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, Destination, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{AnnouncementPayload, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two outbound calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same chat. Telegram allows about
    /// 20 messages per minute into one group.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),    // ~25/sec
            per_chat_min_interval: Duration::from_millis(3050), // ~19/min
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// A limiter whose next slot has already passed behaves like a new one.
    fn is_idle(&self, now: Instant) -> bool {
        self.next <= now
    }

    /// Reserve the next slot and return how long the caller must wait for it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = now.max(self.next);
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces out outbound calls.
///
/// Announcements fan out to several chats at once, and manual raids can land on
/// top of a watcher announcement; this keeps both under Telegram flood limits.
/// `RetryAfter` responses are still retried by the Telegram adapter itself.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<Destination, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, destination: &Destination) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        // Drop idle limiters so the map tracks only chats with pending spacing.
        // A limiter held elsewhere or currently locked is in use and stays.
        let now = Instant::now();
        map.retain(|_, lim| {
            Arc::strong_count(lim) > 1 || lim.try_lock().map_or(true, |l| !l.is_idle(now))
        });
        map.entry(destination.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, destination: &Destination) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for(destination).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    #[cfg(test)]
    async fn tracked_chats(&self) -> usize {
        self.per_chat.lock().await.len()
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_announcement(
        &self,
        destination: &Destination,
        payload: &AnnouncementPayload,
    ) -> Result<MessageRef> {
        self.throttle_chat(destination).await;
        self.inner.send_announcement(destination, payload).await
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.throttle_chat(&Destination::Id(chat_id)).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_reply(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        self.throttle_chat(&Destination::Id(to.chat_id)).await;
        self.inner.send_reply(to, text).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        // No chat_id available here; apply global throttling only.
        self.throttle_global().await;
        self.inner.answer_callback_query(callback_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;

    struct NullMessenger;

    #[async_trait::async_trait]
    impl MessagingPort for NullMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_photos: true,
                max_caption_len: 1024,
                max_message_len: 4096,
            }
        }

        async fn send_announcement(
            &self,
            _destination: &Destination,
            _payload: &AnnouncementPayload,
        ) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id: ChatId(1),
                message_id: MessageId(1),
            })
        }

        async fn send_text(&self, chat_id: ChatId, _text: &str) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_reply(&self, to: MessageRef, _text: &str) -> Result<MessageRef> {
            Ok(to)
        }

        async fn answer_callback_query(&self, _id: &str, _text: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_spaces_consecutive_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_secs(3));
        assert_eq!(lim.reserve(), Duration::ZERO);
        assert_eq!(lim.reserve(), Duration::from_secs(3));
        assert_eq!(lim.reserve(), Duration::from_secs(6));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(lim.reserve(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn same_chat_is_spaced_but_other_chats_are_not() {
        let messenger = ThrottledMessenger::new(
            Arc::new(NullMessenger),
            ThrottleConfig {
                global_min_interval: Duration::ZERO,
                per_chat_min_interval: Duration::from_secs(3),
            },
        );

        let start = Instant::now();
        messenger.send_text(ChatId(1), "a").await.unwrap();
        messenger.send_text(ChatId(2), "b").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        messenger.send_text(ChatId(1), "c").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_chat_limiters_are_dropped() {
        let messenger = ThrottledMessenger::new(
            Arc::new(NullMessenger),
            ThrottleConfig {
                global_min_interval: Duration::ZERO,
                per_chat_min_interval: Duration::from_secs(3),
            },
        );

        for id in 1..=5 {
            messenger.send_text(ChatId(id), "hi").await.unwrap();
        }
        assert_eq!(messenger.tracked_chats().await, 5);

        tokio::time::advance(Duration::from_secs(4)).await;
        messenger.send_text(ChatId(99), "hi").await.unwrap();
        assert_eq!(messenger.tracked_chats().await, 1);
    }
}
