use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::ResolutionMethod;

pub const INSUFFICIENT_SENTIMENT_MESSAGE: &str = "Insufficient data for sentiment analysis";
pub const ORACLE_PENDING_MESSAGE: &str = "Awaiting oracle resolution";
pub const MANUAL_PENDING_MESSAGE: &str = "Pending manual resolution";

/// The outcome of one resolution call. Exactly one shape is ever produced,
/// discriminated by `status` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionRecord {
    Decided(DecidedResolution),
    Pending(PendingResolution),
    Error(ResolutionFailure),
}

impl ResolutionRecord {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Decided(_) => "decided",
            Self::Pending(_) => "pending",
            Self::Error(_) => "error",
        }
    }

    pub fn market_id(&self) -> Option<&str> {
        match self {
            Self::Decided(d) => Some(&d.market_id),
            Self::Pending(p) => Some(&p.market_id),
            Self::Error(e) => e.market_id.as_deref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// A market resolved to a single winning outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecidedResolution {
    pub market_id: String,
    pub question: String,
    pub outcomes: Vec<String>,
    pub winning_outcome: String,
    /// Position of `winning_outcome` in `outcomes`.
    pub winning_index: usize,
    /// Share of analyzed items supporting the winner, rounded to 4 places.
    #[serde(with = "rust_decimal::serde::float")]
    pub confidence: Decimal,
    pub resolution_method: ResolutionMethod,
    pub breakdown: BTreeMap<String, OutcomeBreakdown>,
    pub total_analyzed: usize,
    /// Items classified below threshold or outside the outcome set.
    pub unclassified_count: usize,
    /// Items whose classification failed, timed out or was malformed.
    pub failed_count: usize,
    /// Winner holds at least the dominance share of analyzed items.
    pub dominant: bool,
    pub timestamp: DateTime<Utc>,
}

/// Per-outcome support statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeBreakdown {
    pub support_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub support_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_confidence: Decimal,
}

/// A market that could not be decided yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingResolution {
    pub market_id: String,
    pub question: String,
    pub outcomes: Vec<String>,
    /// Always `None`; kept so pending and decided records share a shape.
    pub winning_outcome: Option<String>,
    /// Always -1.
    pub winning_index: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub confidence: Decimal,
    pub resolution_method: ResolutionMethod,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PendingResolution {
    pub fn new(
        market_id: String,
        question: String,
        outcomes: Vec<String>,
        resolution_method: ResolutionMethod,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            market_id,
            question,
            outcomes,
            winning_outcome: None,
            winning_index: -1,
            confidence: Decimal::ZERO,
            resolution_method,
            message: message.into(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was unacceptable.
    Validation,
    /// Anything else: classifier unavailable, internal failure, unreadable input.
    Unexpected,
}

/// A resolution call that failed. Identifiers are included when known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<String>>,
    pub error: String,
    pub error_kind: ErrorKind,
    pub timestamp: DateTime<Utc>,
}

impl ResolutionFailure {
    /// A failure with no market context, e.g. unreadable input.
    pub fn bare(
        error: impl Into<String>,
        error_kind: ErrorKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            market_id: None,
            question: None,
            outcomes: None,
            error: error.into(),
            error_kind,
            timestamp,
        }
    }
}
