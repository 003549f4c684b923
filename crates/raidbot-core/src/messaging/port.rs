use async_trait::async_trait;

use crate::{
    domain::{ChatId, Destination, MessageRef},
    messaging::types::{AnnouncementPayload, MessagingCapabilities},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation today; the dispatcher and handlers only
/// ever talk to this trait.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Deliver one announcement (photo + caption + buttons, or text + buttons
    /// when the payload has no image).
    async fn send_announcement(
        &self,
        destination: &Destination,
        payload: &AnnouncementPayload,
    ) -> Result<MessageRef>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Send `text` into the chat of `to`, quoting that message.
    async fn send_reply(&self, to: MessageRef, text: &str) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
