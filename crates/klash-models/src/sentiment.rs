use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candidate labels for polarity classification, in declared order.
pub const SENTIMENT_LABELS: [&str; 3] = ["positive", "negative", "neutral"];

pub const NO_SENTIMENT_SAMPLE_MESSAGE: &str = "No valid tweets to analyze";

/// Polarity label for one tweet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Map a classifier label to a sentiment. Unknown or missing labels are
    /// neutral.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()) {
            Some(l) if l.starts_with("pos") => Self::Positive,
            Some(l) if l.starts_with("neg") => Self::Negative,
            _ => Self::Neutral,
        }
    }

    /// +1, -1 or 0.
    pub fn sign(self) -> Decimal {
        match self {
            Self::Positive => Decimal::ONE,
            Self::Negative => Decimal::NEGATIVE_ONE,
            Self::Neutral => Decimal::ZERO,
        }
    }
}

/// Overall verdict for a batch of tweets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentOutcome {
    Positive,
    Negative,
    Neutral,
}

impl SentimentOutcome {
    /// `Positive` above `threshold`, `Negative` below `-threshold`.
    pub fn from_polarity(avg_polarity: Decimal, threshold: Decimal) -> Self {
        if avg_polarity > threshold {
            Self::Positive
        } else if avg_polarity < -threshold {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentDetail {
    pub tweet_id: String,
    pub text: String,
    pub sentiment: Sentiment,
    #[serde(with = "rust_decimal::serde::float")]
    pub confidence: Decimal,
    /// Sign of `sentiment` scaled by `confidence`, -1.0 to 1.0.
    #[serde(with = "rust_decimal::serde::float")]
    pub polarity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    pub outcome: SentimentOutcome,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_polarity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_confidence: Decimal,
    /// Tweets with text that produced a judgment.
    pub sample_size: usize,
    pub failed_count: usize,
    pub detailed_sentiments: Vec<SentimentDetail>,
}
