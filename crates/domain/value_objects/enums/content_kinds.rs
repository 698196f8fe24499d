use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The four gated content kinds. Each maps to its backing table and owner
/// column for month-to-date usage counting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Legacy,
    Idea,
    Timeless,
    Wisdom,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Legacy => "legacy",
            ContentKind::Idea => "idea",
            ContentKind::Timeless => "timeless",
            ContentKind::Wisdom => "wisdom",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Legacy => "legacy_posts",
            ContentKind::Idea => "idea_posts",
            ContentKind::Timeless => "timeless_messages",
            ContentKind::Wisdom => "wisdom_resources",
        }
    }

    /// Wisdom resources record their author in `created_by`; every other
    /// content table uses `user_id`.
    pub fn owner_column(&self) -> &'static str {
        match self {
            ContentKind::Wisdom => "created_by",
            _ => "user_id",
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
