use std::sync::Arc;

use tracing::{debug, info, warn};

use raidbot_core::{
    domain::{ChatId, UserId},
    messaging::{port::MessagingPort, types::Command},
};

use crate::router::AppState;

#[derive(Debug, PartialEq, Eq)]
pub(super) struct ParsedCommand {
    pub name: String,
    /// `botname` from `/cmd@botname`, as typed.
    pub mention: Option<String>,
}

impl ParsedCommand {
    /// A bare `/cmd` is for every bot in the chat; `/cmd@name` only for `name`.
    /// Without our own username a mention cannot be matched, so it is refused.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (self.mention.as_deref(), bot_username) {
            (None, _) => true,
            (Some(mention), Some(me)) => mention.eq_ignore_ascii_case(me.trim_start_matches('@')),
            (Some(_), None) => false,
        }
    }
}

pub(super) fn parse_command(text: &str) -> ParsedCommand {
    // Telegram may send `/cmd@botname arg1 ...`
    let first = text.split_whitespace().next().unwrap_or("");
    let mut parts = first.trim_start_matches('/').splitn(2, '@');
    let name = parts.next().unwrap_or("").to_lowercase();
    let mention = parts
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    ParsedCommand { name, mention }
}

fn start_text() -> &'static str {
    "Hello! Use /raid to share your tweet.\n\n\
     You can also paste a tweet link here and I'll raid it."
}

fn debug_text(chat_id: ChatId, user_id: UserId) -> String {
    format!("This chat ID is: {}\nYour user ID is: {}", chat_id.0, user_id.0)
}

pub(super) async fn handle_command(cmd: Command, state: Arc<AppState>) {
    info!(command = %cmd.name, chat = cmd.chat_id.0, user = cmd.user_id.0, "received command");

    let reply = match cmd.name.as_str() {
        "start" | "help" => start_text().to_string(),
        "raid" => state.triggers.raid_latest(cmd.user_id).await.reply_text(),
        "debugid" | "debug" => debug_text(cmd.chat_id, cmd.user_id),
        _ => {
            debug!(command = %cmd.name, "ignoring unknown command");
            return;
        }
    };

    if let Err(e) = state.messenger.send_text(cmd.chat_id, &reply).await {
        warn!(command = %cmd.name, chat = cmd.chat_id.0, error = %e, "failed to reply to command");
    }
}
