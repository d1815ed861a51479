use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request sent to a classifier for one reply item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRequest {
    pub request_id: Uuid,
    pub item_id: String,
    pub text: String,
    /// Candidate outcome labels, in declared order.
    pub candidate_labels: Vec<String>,
}

impl ClassificationRequest {
    pub fn new(item_id: impl Into<String>, text: impl Into<String>, labels: &[String]) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            item_id: item_id.into(),
            text: text.into(),
            candidate_labels: labels.to_vec(),
        }
    }
}

/// The classifier's verdict for one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Judgment {
    /// Best label, or `None` when its score fell below the acceptance threshold.
    pub label: Option<String>,
    /// Score of the best label, 0.0 to 1.0.
    pub confidence: Decimal,
    /// Score for every candidate label.
    #[serde(default)]
    pub scores: BTreeMap<String, Decimal>,
}

impl Judgment {
    pub fn new(label: Option<String>, confidence: Decimal) -> Self {
        Self {
            label,
            confidence,
            scores: BTreeMap::new(),
        }
    }

    pub fn labelled(label: impl Into<String>, confidence: Decimal) -> Self {
        Self::new(Some(label.into()), confidence)
    }

    /// Build a judgment from per-label scores.
    ///
    /// The best label is the highest score; on equal scores the label that
    /// comes first in `candidates` wins. Labels missing from `scores` count
    /// as zero. Returns an unlabelled zero-confidence judgment when
    /// `candidates` is empty.
    pub fn from_scores(
        candidates: &[String],
        scores: BTreeMap<String, Decimal>,
        acceptance_threshold: Decimal,
    ) -> Self {
        let mut best: Option<(&String, Decimal)> = None;
        for label in candidates {
            let score = scores.get(label).copied().unwrap_or(Decimal::ZERO);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((label, score)),
            }
        }

        let (label, confidence) = match best {
            Some((label, score)) if score >= acceptance_threshold => (Some(label.clone()), score),
            Some((_, score)) => (None, score),
            None => (None, Decimal::ZERO),
        };

        Self {
            label,
            confidence,
            scores,
        }
    }
}
