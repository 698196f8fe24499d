use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::mentorship_levels::MentorshipLevel;

/// Internal plan identity the gate reasons about. Derived from the catalog
/// whenever possible; the human tier string is only a fallback.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanAlias {
    #[default]
    Free,
    Builder,
    Master,
}

impl PlanAlias {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAlias::Free => "free",
            PlanAlias::Builder => "builder",
            PlanAlias::Master => "master",
        }
    }

    /// Fallback mapper for subscriber rows that carry only the human-readable
    /// tier name. Unknown or absent tiers resolve to `Free`.
    pub fn from_tier_name(tier: Option<&str>) -> Self {
        match tier {
            Some("Builder – Legacy Builder") | Some("builder") => PlanAlias::Builder,
            Some("Master – Legacy Master") | Some("master") => PlanAlias::Master,
            _ => PlanAlias::Free,
        }
    }

    /// Maps the catalog's mentorship-access value to a plan alias. This is the
    /// preferred derivation when the subscriber row has a plan id.
    pub fn from_mentorship(level: MentorshipLevel) -> Self {
        match level {
            MentorshipLevel::MentorMentee => PlanAlias::Master,
            MentorshipLevel::Mentee => PlanAlias::Builder,
            MentorshipLevel::None => PlanAlias::Free,
        }
    }
}

impl Display for PlanAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
