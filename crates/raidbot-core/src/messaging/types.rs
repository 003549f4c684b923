use crate::domain::{ChatId, MessageRef, UserId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Callback(CallbackQuery),
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Lowercased, without the leading `/` or any `@botname` suffix.
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub is_private: bool,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub data: String,
    /// `@username` if set, otherwise the first name.
    pub display_name: Option<String>,
    /// The message carrying the button; absent when Telegram no longer has it.
    pub message: Option<MessageRef>,
}

/// Button that opens a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlButton {
    pub label: String,
    pub url: String,
}

/// Button that posts an opaque token back to the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackButton {
    pub label: String,
    pub token: String,
}

/// Everything a messenger needs to render one announcement.
#[derive(Clone, Debug)]
pub struct AnnouncementPayload {
    pub caption: String,
    pub primary_button: UrlButton,
    pub secondary_button: CallbackButton,
    /// Banner image bytes; `None` means send as plain text.
    pub image: Option<Vec<u8>>,
}

/// Limits of a messenger implementation, consulted when building payloads.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_photos: bool,
    /// Longest caption accepted on a photo, in characters.
    pub max_caption_len: usize,
    /// Longest plain text message, in characters.
    pub max_message_len: usize,
}
