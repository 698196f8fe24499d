use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Mentorship access ladder. The database stores `both` for the top level;
/// the gate calls it `mentor_mentee`.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MentorshipLevel {
    #[default]
    None,
    Mentee,
    MentorMentee,
}

impl MentorshipLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorshipLevel::None => "none",
            MentorshipLevel::Mentee => "mentee",
            MentorshipLevel::MentorMentee => "mentor_mentee",
        }
    }

    /// Parses either spelling of the top level; unknown values collapse to
    /// `None` so a malformed row can never widen access.
    pub fn from_db_value(value: &str) -> Self {
        match value {
            "mentee" => MentorshipLevel::Mentee,
            "both" | "mentor_mentee" => MentorshipLevel::MentorMentee,
            _ => MentorshipLevel::None,
        }
    }
}

impl Display for MentorshipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
