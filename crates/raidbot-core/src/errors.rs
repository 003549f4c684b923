/// Core error type for the relay.
///
/// Adapter crates map their transport errors into this type so the
/// dispatcher and handlers can treat failures consistently. Feed failures
/// have their own [`crate::feed::FeedError`] because the watcher branches on
/// them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
