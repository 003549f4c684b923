use std::sync::Arc;

use tracing::{debug, warn};

use raidbot_core::{
    copy::{engagement_reply, ENGAGEMENT_TOKEN},
    domain::MessageRef,
    messaging::{port::MessagingPort, types::CallbackQuery},
};

use crate::router::AppState;

/// Where and what to reply for a button press, if anything.
fn engagement_target(q: &CallbackQuery) -> Option<(MessageRef, String)> {
    if q.data != ENGAGEMENT_TOKEN {
        return None;
    }
    let message = q.message?;
    Some((message, engagement_reply(q.display_name.as_deref())))
}

pub(super) async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) {
    // Always answer the callback so the client stops its spinner.
    if let Err(e) = state.messenger.answer_callback_query(&q.callback_id, None).await {
        warn!(error = %e, "failed to answer callback query");
    }

    let Some((message, reply)) = engagement_target(&q) else {
        debug!(data = %q.data, has_message = q.message.is_some(), "no engagement reply");
        return;
    };

    if let Err(e) = state.messenger.send_reply(message, &reply).await {
        warn!(chat = message.chat_id.0, error = %e, "failed to post engagement reply");
    }
}
