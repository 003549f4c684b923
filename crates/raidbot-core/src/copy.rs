//! Announcement wording.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Callback token carried by the engagement button.
pub const ENGAGEMENT_TOKEN: &str = "engaged";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyVariant {
    pub caption: String,
    pub primary_label: String,
    pub secondary_label: String,
}

impl CopyVariant {
    pub fn new(caption: &str, primary_label: &str, secondary_label: &str) -> Self {
        Self {
            caption: caption.to_string(),
            primary_label: primary_label.to_string(),
            secondary_label: secondary_label.to_string(),
        }
    }
}

/// Rotating set of caption/button wordings.
#[derive(Debug)]
pub struct AnnouncementCopy {
    variants: Vec<CopyVariant>,
    next: AtomicUsize,
}

impl AnnouncementCopy {
    /// An empty list falls back to the built-in variants.
    pub fn new(variants: Vec<CopyVariant>) -> Self {
        let variants = if variants.is_empty() {
            default_variants()
        } else {
            variants
        };
        Self {
            variants,
            next: AtomicUsize::new(0),
        }
    }

    /// Next variant, round-robin.
    pub fn pick(&self) -> &CopyVariant {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.variants.len();
        &self.variants[idx]
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Default for AnnouncementCopy {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn default_variants() -> Vec<CopyVariant> {
    vec![
        CopyVariant::new(
            "💥Post & Prosper - Time to go viral",
            "🏀 Dunked that tweet!",
            "💫 Swished! Slam dunk!🔥",
        ),
        CopyVariant::new(
            "🔥 New tweet is out!\nSmash it on X 👇",
            "🚀 Smashed that tweet!",
            "🔥 Tweet Smashed!",
        ),
    ]
}

/// Reply posted when someone presses the engagement button.
pub fn engagement_reply(display_name: Option<&str>) -> String {
    match display_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => format!("🤩 @{} has dunked it! 💥", name.trim_start_matches('@')),
        None => "Someone engaged with the tweet!".to_string(),
    }
}
