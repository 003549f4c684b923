//! Core of the raid relay bot.
//!
//! Watches one X account for new posts and fans announcements out to Telegram
//! chats. This crate is framework-agnostic: Telegram and the X API live
//! behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod cooldown;
pub mod copy;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod logging;
pub mod messaging;
pub mod triggers;
pub mod watcher;

pub use errors::{Error, Result};
