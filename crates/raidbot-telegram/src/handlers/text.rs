use std::sync::Arc;

use tracing::warn;

use raidbot_core::messaging::{port::MessagingPort, types::TextMessage};

use crate::router::AppState;

/// Pasted tweet links are only taken from private chats so ordinary group
/// chatter never gets a rejection reply.
fn accepts_paste(msg: &TextMessage) -> bool {
    msg.is_private && !msg.text.trim().is_empty()
}

pub(super) async fn handle_text(msg: TextMessage, state: Arc<AppState>) {
    if !accepts_paste(&msg) {
        return;
    }

    let outcome = state.triggers.raid_from_text(msg.user_id, &msg.text).await;
    if let Err(e) = state
        .messenger
        .send_text(msg.chat_id, &outcome.reply_text())
        .await
    {
        warn!(chat = msg.chat_id.0, error = %e, "failed to reply to pasted link");
    }
}
