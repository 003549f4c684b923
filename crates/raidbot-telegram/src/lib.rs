//! Telegram adapter (teloxide).
//!
//! This crate implements the `raidbot-core` MessagingPort over the Telegram Bot
//! API and routes inbound updates to the command / button / text handlers.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Recipient},
};

use tokio::time::sleep;
use tracing::debug;

pub mod handlers;
pub mod router;

use raidbot_core::{
    domain::{ChatId, Destination, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{AnnouncementPayload, MessagingCapabilities},
    },
    Result,
};

const MAX_CAPTION_LEN: usize = 1024;
const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn recipient(destination: &Destination) -> Recipient {
        match destination {
            Destination::Handle(h) => Recipient::ChannelUsername(h.clone()),
            Destination::Id(id) => Recipient::Id(Self::tg_chat(*id)),
        }
    }

    fn keyboard(payload: &AnnouncementPayload) -> Result<InlineKeyboardMarkup> {
        let url = reqwest::Url::parse(&payload.primary_button.url).map_err(|e| {
            Error::External(format!(
                "invalid announcement url {:?}: {e}",
                payload.primary_button.url
            ))
        })?;
        Ok(InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::url(
                payload.primary_button.label.clone(),
                url,
            )],
            vec![InlineKeyboardButton::callback(
                payload.secondary_button.label.clone(),
                payload.secondary_button.token.clone(),
            )],
        ]))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        debug!(wait_secs = d.as_secs(), "telegram asked us to retry later");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_photos: true,
            max_caption_len: MAX_CAPTION_LEN,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn send_announcement(
        &self,
        destination: &Destination,
        payload: &AnnouncementPayload,
    ) -> Result<MessageRef> {
        let markup = Self::keyboard(payload)?;
        let recipient = Self::recipient(destination);

        let sent = match &payload.image {
            Some(bytes) => {
                self.with_retry(|| {
                    self.bot
                        .send_photo(
                            recipient.clone(),
                            InputFile::memory(bytes.clone()).file_name("raid.png"),
                        )
                        .caption(payload.caption.clone())
                        .reply_markup(markup.clone())
                })
                .await
            }
            None => {
                self.with_retry(|| {
                    self.bot
                        .send_message(recipient.clone(), payload.caption.clone())
                        .reply_markup(markup.clone())
                })
                .await
            }
        };

        let msg = sent.map_err(|e| Error::Delivery {
            destination: destination.to_string(),
            reason: e.to_string(),
        })?;

        Ok(MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_reply(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), text.to_string())
                    .reply_to_message_id(teloxide::types::MessageId(to.message_id.0))
                    .allow_sending_without_reply(true)
            })
            .await?;

        Ok(MessageRef {
            chat_id: to.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raidbot_core::messaging::types::{CallbackButton, UrlButton};

    fn payload(url: &str) -> AnnouncementPayload {
        AnnouncementPayload {
            caption: "🔥 New tweet is out!".to_string(),
            primary_button: UrlButton {
                label: "🚀 Smashed that tweet!".to_string(),
                url: url.to_string(),
            },
            secondary_button: CallbackButton {
                label: "🔥 Tweet Smashed!".to_string(),
                token: "engaged".to_string(),
            },
            image: None,
        }
    }

    #[test]
    fn keyboard_has_link_row_then_callback_row() {
        let markup = TelegramMessenger::keyboard(&payload("https://x.com/foo/status/555")).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "🚀 Smashed that tweet!");
        assert_eq!(markup.inline_keyboard[1][0].text, "🔥 Tweet Smashed!");
    }

    #[test]
    fn keyboard_rejects_invalid_url() {
        assert!(TelegramMessenger::keyboard(&payload("not a url")).is_err());
    }

    #[test]
    fn recipient_maps_handles_and_ids() {
        assert!(matches!(
            TelegramMessenger::recipient(&Destination::Handle("@raidchan".to_string())),
            Recipient::ChannelUsername(ref h) if h == "@raidchan"
        ));
        assert!(matches!(
            TelegramMessenger::recipient(&Destination::Id(ChatId(-1001))),
            Recipient::Id(teloxide::types::ChatId(-1001))
        ));
    }
}
