use std::fmt;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A place announcements are delivered to.
///
/// Public channels are addressed by `@handle`, groups by numeric chat id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    Handle(String),
    Id(ChatId),
}

impl Destination {
    /// Parse one configured entry. Empty strings and `0` yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(id) = s.parse::<i64>() {
            return (id != 0).then_some(Destination::Id(ChatId(id)));
        }
        let handle = s.trim_start_matches('@');
        if handle.is_empty() {
            return None;
        }
        Some(Destination::Handle(format!("@{handle}")))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Handle(h) => f.write_str(h),
            Destination::Id(id) => write!(f, "{}", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_parse_accepts_handles_and_ids() {
        assert_eq!(
            Destination::parse("@raidchan"),
            Some(Destination::Handle("@raidchan".to_string()))
        );
        assert_eq!(
            Destination::parse("raidchan"),
            Some(Destination::Handle("@raidchan".to_string()))
        );
        assert_eq!(
            Destination::parse(" -1001234 "),
            Some(Destination::Id(ChatId(-1001234)))
        );
    }

    #[test]
    fn destination_parse_filters_empty_and_zero() {
        assert_eq!(Destination::parse(""), None);
        assert_eq!(Destination::parse("   "), None);
        assert_eq!(Destination::parse("0"), None);
        assert_eq!(Destination::parse("@"), None);
    }
}
