use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::ReplyEntry;

pub const UNDECIDED_TEAM: &str = "Undecided";

/// Request to split a set of tweets into teams around a controversy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamClassificationRequest {
    pub controversy: String,
    pub teams: Vec<String>,
    #[serde(default)]
    pub tweets: Vec<ReplyEntry>,
}

/// A reply item that landed on an outcome, as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supporter {
    pub tweet_id: String,
    pub author: String,
    pub text: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub confidence: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamStats {
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_confidence: Decimal,
    /// Highest-confidence supporters first, capped.
    pub supporters: Vec<Supporter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamReport {
    pub controversy: String,
    /// Winning team label, or [`UNDECIDED_TEAM`].
    pub winning_team: String,
    pub team_stats: BTreeMap<String, TeamStats>,
    pub total_classified: usize,
    pub unclassified_count: usize,
    pub dominant: bool,
}

impl TeamReport {
    pub fn is_undecided(&self) -> bool {
        self.winning_team == UNDECIDED_TEAM
    }
}
