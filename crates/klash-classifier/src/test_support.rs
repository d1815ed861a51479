//! Test support classifiers.
//!
//! `ScriptedClassifier` replays canned judgments keyed on the exact reply
//! text. `RawOutputClassifier` replays canned model output through the real
//! response parser. `KeywordClassifier` scores labels by whether they appear
//! in the text, which is enough to drive realistic end-to-end scenarios
//! without a model.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use klash_models::judgment::{ClassificationRequest, Judgment};
use rust_decimal::Decimal;

use crate::classifier::OutcomeClassifier;
use crate::error::ClassifierError;
use crate::parser::parse_judgment;

#[derive(Debug, Clone)]
enum Script {
    Judge(Judgment),
    Fail(String),
    Delay(Duration, Judgment),
    Panic,
}

/// Replays a fixed script. Texts without a script fail with a parse error.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    scripts: HashMap<String, Script>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` with `label` at `confidence`.
    pub fn judge(self, text: &str, label: &str, confidence: Decimal) -> Self {
        self.judgment(text, Judgment::labelled(label, confidence))
    }

    /// Answer `text` with an arbitrary judgment.
    pub fn judgment(mut self, text: &str, judgment: Judgment) -> Self {
        self.scripts.insert(text.to_string(), Script::Judge(judgment));
        self
    }

    pub fn fail(mut self, text: &str, message: &str) -> Self {
        self.scripts
            .insert(text.to_string(), Script::Fail(message.to_string()));
        self
    }

    /// Answer `text` only after sleeping for `delay`.
    pub fn delay(mut self, text: &str, delay: Duration, label: &str, confidence: Decimal) -> Self {
        self.scripts.insert(
            text.to_string(),
            Script::Delay(delay, Judgment::labelled(label, confidence)),
        );
        self
    }

    pub fn panic_on(mut self, text: &str) -> Self {
        self.scripts.insert(text.to_string(), Script::Panic);
        self
    }

    /// Make `initialize` fail.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of `classify` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutcomeClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn initialize(&self) -> Result<(), ClassifierError> {
        if self.unavailable {
            return Err(ClassifierError::Unavailable("scripted outage".to_string()));
        }
        Ok(())
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.scripts.get(&request.text).cloned() {
            Some(Script::Judge(judgment)) => Ok(judgment),
            Some(Script::Fail(message)) => Err(ClassifierError::Cli(message)),
            Some(Script::Delay(delay, judgment)) => {
                tokio::time::sleep(delay).await;
                Ok(judgment)
            }
            Some(Script::Panic) => panic!("scripted panic for item {}", request.item_id),
            None => Err(ClassifierError::Parse(format!(
                "no script for text {:?}",
                request.text
            ))),
        }
    }
}

/// Answers with canned CLI output, parsed as the Claude classifier would.
#[derive(Debug, Default)]
pub struct RawOutputClassifier {
    outputs: HashMap<String, String>,
    acceptance_threshold: Decimal,
}

impl RawOutputClassifier {
    pub fn new(acceptance_threshold: Decimal) -> Self {
        Self {
            outputs: HashMap::new(),
            acceptance_threshold,
        }
    }

    /// Reply to `text` with `raw` model output.
    pub fn respond(mut self, text: &str, raw: &str) -> Self {
        self.outputs.insert(text.to_string(), raw.to_string());
        self
    }
}

#[async_trait]
impl OutcomeClassifier for RawOutputClassifier {
    fn name(&self) -> &str {
        "raw-output"
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError> {
        let raw = self
            .outputs
            .get(&request.text)
            .ok_or_else(|| ClassifierError::Cli(format!("no output for {:?}", request.text)))?;
        parse_judgment(raw, &request.candidate_labels, self.acceptance_threshold)
    }
}

/// Scores a label highly when it occurs (case-insensitively) in the text.
///
/// Exactly one matching label receives `hit_confidence` and the remainder is
/// split evenly across the other labels. No match, or several, yields an
/// even split, which falls below any acceptance threshold above `1/n`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    pub hit_confidence: Decimal,
    pub acceptance_threshold: Decimal,
}

impl KeywordClassifier {
    pub fn new(hit_confidence: Decimal) -> Self {
        Self {
            hit_confidence,
            acceptance_threshold: Decimal::new(5, 1),
        }
    }

    fn scores(&self, text: &str, labels: &[String]) -> BTreeMap<String, Decimal> {
        let lowered = text.to_lowercase();
        let hits: Vec<&String> = labels
            .iter()
            .filter(|l| lowered.contains(&l.to_lowercase()))
            .collect();

        let n = Decimal::from(labels.len().max(1));
        let (hit, others) = match hits.as_slice() {
            [single] if labels.len() > 1 => {
                let rest = (Decimal::ONE - self.hit_confidence) / (n - Decimal::ONE);
                (Some(*single), rest)
            }
            _ => (None, Decimal::ONE / n),
        };

        labels
            .iter()
            .map(|label| {
                let score = if Some(label) == hit {
                    self.hit_confidence
                } else {
                    others
                };
                (label.clone(), score.round_dp(4))
            })
            .collect()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(Decimal::new(9, 1))
    }
}

#[async_trait]
impl OutcomeClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError> {
        let scores = self.scores(&request.text, &request.candidate_labels);
        Ok(Judgment::from_scores(
            &request.candidate_labels,
            scores,
            self.acceptance_threshold,
        ))
    }
}
