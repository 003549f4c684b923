//! Telegram update handlers.
//!
//! Each handler converts the teloxide update into the core `IncomingUpdate`
//! model, runs the matching core operation and replies through the messenger.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use raidbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{self, IncomingUpdate},
};

use crate::router::AppState;

mod callback;
mod commands;
mod text;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    if let IncomingUpdate::Callback(cb) = incoming_from_callback(&q) {
        callback::handle_callback(cb, state).await;
    }
    Ok(())
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let update = incoming_from_message(&msg, state.bot_username.as_deref());
    match update {
        Some(IncomingUpdate::Command(cmd)) => commands::handle_command(cmd, state).await,
        Some(IncomingUpdate::Text(text)) => text::handle_text(text, state).await,
        // Stickers, photos, service messages, anonymous admins, other bots' commands.
        _ => {}
    }
    Ok(())
}

fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

fn incoming_from_message(msg: &Message, bot_username: Option<&str>) -> Option<IncomingUpdate> {
    let user = msg.from()?;
    let text = msg.text()?;
    classify_text(
        ChatId(msg.chat.id.0),
        UserId(user.id.0 as i64),
        msg.chat.is_private(),
        text,
        bot_username,
    )
}

/// Commands start with `/`; anything else is plain text. Commands addressed
/// to another bot yield `None`.
fn classify_text(
    chat_id: ChatId,
    user_id: UserId,
    is_private: bool,
    text: &str,
    bot_username: Option<&str>,
) -> Option<IncomingUpdate> {
    if text.starts_with('/') {
        let parsed = commands::parse_command(text);
        if !parsed.is_addressed_to(bot_username) {
            return None;
        }
        return Some(IncomingUpdate::Command(types::Command {
            chat_id,
            user_id,
            name: parsed.name,
        }));
    }

    Some(IncomingUpdate::Text(types::TextMessage {
        chat_id,
        user_id,
        is_private,
        text: text.to_string(),
    }))
}

fn incoming_from_callback(q: &CallbackQuery) -> IncomingUpdate {
    IncomingUpdate::Callback(types::CallbackQuery {
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        display_name: Some(display_name(&q.from)),
        message: q.message.as_ref().map(|m| MessageRef {
            chat_id: ChatId(m.chat.id.0),
            message_id: MessageId(m.id.0),
        }),
    })
}
