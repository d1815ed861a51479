use std::collections::HashSet;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutcomeSetError {
    #[error("fewer than two labels")]
    TooFew,
    #[error("blank label")]
    Blank,
    #[error("duplicate label: {0}")]
    Duplicate(String),
}

/// Ordered, unique candidate labels for one resolution. Order defines the
/// reported winning index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeSet(Vec<String>);

impl OutcomeSet {
    pub fn new(labels: Vec<String>) -> Result<Self, OutcomeSetError> {
        if labels.len() < 2 {
            return Err(OutcomeSetError::TooFew);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if label.trim().is_empty() {
                return Err(OutcomeSetError::Blank);
            }
            if !seen.insert(label.as_str()) {
                return Err(OutcomeSetError::Duplicate(label.clone()));
            }
        }

        Ok(Self(labels))
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}
