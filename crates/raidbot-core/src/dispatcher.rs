//! Announcement fan-out.
//!
//! One announcement goes to every configured destination. Each delivery is
//! attempted on its own; a failing chat is recorded in the report and the
//! remaining chats are still tried.

use std::{collections::HashSet, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    copy::{AnnouncementCopy, ENGAGEMENT_TOKEN},
    domain::Destination,
    messaging::{
        port::MessagingPort,
        types::{AnnouncementPayload, CallbackButton, UrlButton},
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub destination: Destination,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }

    /// Short human summary, e.g. `2/3`.
    pub fn summary(&self) -> String {
        format!("{}/{}", self.succeeded, self.attempted)
    }
}

/// Anything that can announce a post link. The watcher and the manual
/// triggers depend on this rather than on [`Dispatcher`] directly.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, tweet_url: &str) -> DispatchReport;
}

pub struct Dispatcher {
    messenger: Arc<dyn MessagingPort>,
    destinations: Vec<Destination>,
    copy: AnnouncementCopy,
    image_path: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        destinations: Vec<Destination>,
        copy: AnnouncementCopy,
        image_path: Option<PathBuf>,
    ) -> Self {
        Self {
            messenger,
            destinations: dedup_destinations(destinations),
            copy,
            image_path,
        }
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Build the payload for one announcement. The caption is cut to what the
    /// messenger accepts for a photo caption or a text message.
    pub fn build_payload(&self, tweet_url: &str, image: Option<Vec<u8>>) -> AnnouncementPayload {
        let variant = self.copy.pick();
        let caps = self.messenger.capabilities();
        let limit = if image.is_some() {
            caps.max_caption_len
        } else {
            caps.max_message_len
        };
        AnnouncementPayload {
            caption: variant.caption.chars().take(limit).collect(),
            primary_button: UrlButton {
                label: variant.primary_label.clone(),
                url: tweet_url.to_string(),
            },
            secondary_button: CallbackButton {
                label: variant.secondary_label.clone(),
                token: ENGAGEMENT_TOKEN.to_string(),
            },
            image,
        }
    }

    async fn load_image(&self) -> Option<Vec<u8>> {
        if !self.messenger.capabilities().supports_photos {
            return None;
        }
        let path = self.image_path.as_ref()?;
        match tokio::fs::read(path).await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                warn!(path = %path.display(), "announcement image is empty; sending text");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "announcement image unavailable; sending text");
                None
            }
        }
    }
}

#[async_trait]
impl Announcer for Dispatcher {
    async fn announce(&self, tweet_url: &str) -> DispatchReport {
        let image = self.load_image().await;
        let payload = self.build_payload(tweet_url, image);

        let mut report = DispatchReport {
            attempted: self.destinations.len(),
            ..DispatchReport::default()
        };

        for destination in &self.destinations {
            match self.messenger.send_announcement(destination, &payload).await {
                Ok(_) => {
                    report.succeeded += 1;
                    info!(%destination, "sent announcement");
                }
                Err(e) => {
                    warn!(%destination, error = %e, "announcement delivery failed");
                    report.failures.push(DeliveryFailure {
                        destination: destination.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            url = tweet_url,
            delivered = %report.summary(),
            "announcement fan-out finished"
        );
        report
    }
}

fn dedup_destinations(destinations: Vec<Destination>) -> Vec<Destination> {
    let mut seen = HashSet::new();
    destinations
        .into_iter()
        .filter(|d| seen.insert(d.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, MessageId, MessageRef},
        messaging::types::MessagingCapabilities,
        Error, Result,
    };
    use std::sync::Mutex;

    /// Records announcements; fails for destinations listed in `failing`.
    struct FakeMessenger {
        caps: MessagingCapabilities,
        failing: Vec<Destination>,
        announcements: Mutex<Vec<(Destination, AnnouncementPayload)>>,
    }

    impl Default for FakeMessenger {
        fn default() -> Self {
            Self {
                caps: MessagingCapabilities {
                    supports_photos: true,
                    max_caption_len: 1024,
                    max_message_len: 4096,
                },
                failing: Vec::new(),
                announcements: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeMessenger {
        fn failing(failing: Vec<Destination>) -> Self {
            Self {
                failing,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(Destination, AnnouncementPayload)> {
            self.announcements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            self.caps
        }

        async fn send_announcement(
            &self,
            destination: &Destination,
            payload: &AnnouncementPayload,
        ) -> Result<MessageRef> {
            if self.failing.contains(destination) {
                return Err(Error::Delivery {
                    destination: destination.to_string(),
                    reason: "chat not found".to_string(),
                });
            }
            self.announcements
                .lock()
                .unwrap()
                .push((destination.clone(), payload.clone()));
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

    fn handle(s: &str) -> Destination {
        Destination::Handle(s.to_string())
    }

    #[tokio::test]
    async fn failing_destination_does_not_block_the_rest() {
        let a = handle("@a");
        let b = Destination::Id(ChatId(-100));
        let messenger = Arc::new(FakeMessenger::failing(vec![a.clone()]));
        let dispatcher = Dispatcher::new(
            messenger.clone(),
            vec![a.clone(), b.clone()],
            AnnouncementCopy::default(),
            None,
        );

        let report = dispatcher
            .announce("https://twitter.com/i/web/status/1")
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].destination, a);
        assert!(report.failures[0].error.contains("chat not found"));
        assert!(!report.all_failed());

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, b);
    }

    #[tokio::test]
    async fn payload_links_post_and_carries_engagement_token() {
        let messenger = Arc::new(FakeMessenger::default());
        let dispatcher = Dispatcher::new(
            messenger.clone(),
            vec![handle("@a")],
            AnnouncementCopy::default(),
            None,
        );

        dispatcher.announce("https://x.com/foo/status/555").await;

        let sent = messenger.sent();
        let payload = &sent[0].1;
        assert_eq!(payload.primary_button.url, "https://x.com/foo/status/555");
        assert_eq!(payload.secondary_button.token, ENGAGEMENT_TOKEN);
        assert!(!payload.caption.is_empty());
        assert!(payload.image.is_none());
    }

    #[tokio::test]
    async fn missing_image_falls_back_to_text_and_present_image_is_attached() {
        let messenger = Arc::new(FakeMessenger::default());
        let missing = Dispatcher::new(
            messenger.clone(),
            vec![handle("@a")],
            AnnouncementCopy::default(),
            Some(PathBuf::from("/nonexistent/raidBot.png")),
        );
        missing.announce("https://x.com/foo/status/1").await;
        assert!(messenger.sent()[0].1.image.is_none());

        let path = std::env::temp_dir().join(format!("raidbot-img-{}.png", std::process::id()));
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let present = Dispatcher::new(
            messenger.clone(),
            vec![handle("@a")],
            AnnouncementCopy::default(),
            Some(path.clone()),
        );
        present.announce("https://x.com/foo/status/1").await;
        assert_eq!(
            messenger.sent()[0].1.image.as_deref(),
            Some(&[0x89, b'P', b'N', b'G'][..])
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn caption_is_cut_to_messenger_limits_and_photos_follow_capability() {
        let path = std::env::temp_dir().join(format!("raidbot-cap-{}.png", std::process::id()));
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let messenger = Arc::new(FakeMessenger {
            caps: MessagingCapabilities {
                supports_photos: true,
                max_caption_len: 5,
                max_message_len: 4096,
            },
            ..FakeMessenger::default()
        });
        let dispatcher = Dispatcher::new(
            messenger.clone(),
            vec![handle("@a")],
            AnnouncementCopy::default(),
            Some(path.clone()),
        );
        dispatcher.announce("https://x.com/foo/status/1").await;
        let sent = messenger.sent();
        assert!(sent[0].1.image.is_some());
        assert_eq!(sent[0].1.caption.chars().count(), 5);

        let text_only = Arc::new(FakeMessenger {
            caps: MessagingCapabilities {
                supports_photos: false,
                max_caption_len: 5,
                max_message_len: 4096,
            },
            ..FakeMessenger::default()
        });
        let dispatcher = Dispatcher::new(
            text_only.clone(),
            vec![handle("@a")],
            AnnouncementCopy::default(),
            Some(path.clone()),
        );
        dispatcher.announce("https://x.com/foo/status/1").await;
        let sent = text_only.sent();
        assert!(sent[0].1.image.is_none());
        assert!(sent[0].1.caption.chars().count() > 5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn duplicate_destinations_are_dropped_in_order() {
        let dispatcher = Dispatcher::new(
            Arc::new(FakeMessenger::default()),
            vec![handle("@a"), handle("@b"), handle("@a")],
            AnnouncementCopy::default(),
            None,
        );
        assert_eq!(dispatcher.destinations(), &[handle("@a"), handle("@b")]);
    }

    #[tokio::test]
    async fn no_destinations_reports_all_failed() {
        let dispatcher = Dispatcher::new(
            Arc::new(FakeMessenger::default()),
            Vec::new(),
            AnnouncementCopy::default(),
            None,
        );
        let report = dispatcher.announce("https://x.com/foo/status/1").await;
        assert_eq!(report.attempted, 0);
        assert!(report.all_failed());
    }
}
