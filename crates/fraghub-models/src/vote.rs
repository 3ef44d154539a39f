use serde::{Deserialize, Serialize};

use crate::labelled_enum;

labelled_enum!(
    VoteType, "vote type" {
        Highlight => "highlight",
        Post => "post",
        Weapon => "weapon",
        Other => "other",
    }
);

impl VoteType {
    /// Human-readable heading used by listings.
    pub fn display_name(self) -> &'static str {
        match self {
            VoteType::Highlight => "Highlight of the day",
            VoteType::Post => "Top post of the week",
            VoteType::Weapon => "A1 or A4?",
            VoteType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionResult {
    pub option_id: i64,
    pub text: String,
    pub votes: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteResults {
    pub vote_id: i64,
    pub total_votes: i64,
    /// Sorted by vote count, highest first.
    pub options: Vec<OptionResult>,
}
