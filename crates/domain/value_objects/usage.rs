use serde::Serialize;

use super::enums::content_kinds::ContentKind;

/// Month-to-date usage for one user. Derived per request, never persisted.
/// A failed source leaves its field at zero and records the first error so
/// the rest of the snapshot stays usable.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub legacy_count_month: i64,
    pub idea_count_month: i64,
    pub timeless_count_month: i64,
    pub wisdom_count_month: i64,
    pub storage_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UsageSnapshot {
    pub fn count_for(&self, kind: ContentKind) -> i64 {
        match kind {
            ContentKind::Legacy => self.legacy_count_month,
            ContentKind::Idea => self.idea_count_month,
            ContentKind::Timeless => self.timeless_count_month,
            ContentKind::Wisdom => self.wisdom_count_month,
        }
    }
}
