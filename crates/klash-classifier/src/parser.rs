use std::collections::BTreeMap;

use klash_models::judgment::Judgment;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ClassifierError;

/// Pull the first JSON object out of model output.
///
/// Accepts a bare object, an object inside a fenced code block, or an
/// object surrounded by prose.
pub fn extract_json(text: &str) -> Result<String, ClassifierError> {
    let trimmed = text.trim();

    let candidates = [
        Some(trimmed.to_string()).filter(|t| t.starts_with('{')),
        fenced_block(trimmed),
        first_balanced_object(trimmed),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|c| serde_json::from_str::<serde_json::Value>(c).is_ok_and(|v| v.is_object()))
        .ok_or_else(|| {
            ClassifierError::Parse(format!(
                "No JSON object found in classifier output (length={})",
                text.len()
            ))
        })
}

fn fenced_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

fn first_balanced_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| text[s..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    scores: BTreeMap<String, Decimal>,
    #[serde(default)]
    best_label: Option<String>,
    #[serde(default)]
    confidence: Option<Decimal>,
}

/// Turn classifier output into a [`Judgment`] over `candidates`.
///
/// Returned labels are matched to candidates exactly, then ignoring case and
/// surrounding whitespace. When no returned label matches a candidate, the
/// judgment keeps the best raw label so the aggregator can count it as
/// unclassified. A bare `best_label`/`confidence` pair is accepted when no
/// `scores` are given.
pub fn parse_judgment(
    raw: &str,
    candidates: &[String],
    acceptance_threshold: Decimal,
) -> Result<Judgment, ClassifierError> {
    let json_str = extract_json(raw)?;
    let parsed: RawClassification = serde_json::from_str(&json_str)
        .map_err(|e| ClassifierError::Parse(format!("Failed to parse classification: {e}")))?;

    let mut raw_scores = parsed.scores;
    if raw_scores.is_empty() {
        if let (Some(label), Some(confidence)) = (parsed.best_label, parsed.confidence) {
            raw_scores.insert(label, confidence);
        }
    }

    if raw_scores.is_empty() {
        return Err(ClassifierError::InvalidJudgment(
            "classification carried no scores".to_string(),
        ));
    }

    let mut scores = BTreeMap::new();
    let mut off_set = BTreeMap::new();
    for (label, score) in raw_scores {
        if score < Decimal::ZERO || score > Decimal::ONE {
            return Err(ClassifierError::InvalidJudgment(format!(
                "score for {label:?} out of range: {score}"
            )));
        }
        match match_candidate(&label, candidates) {
            Some(candidate) => {
                scores.insert(candidate.clone(), score);
            }
            None => {
                off_set.insert(label, score);
            }
        }
    }

    if scores.is_empty() {
        let labels: Vec<String> = off_set.keys().cloned().collect();
        return Ok(Judgment::from_scores(&labels, off_set, acceptance_threshold));
    }

    Ok(Judgment::from_scores(candidates, scores, acceptance_threshold))
}

fn match_candidate<'a>(label: &str, candidates: &'a [String]) -> Option<&'a String> {
    candidates.iter().find(|c| c.as_str() == label).or_else(|| {
        let wanted = label.trim();
        candidates.iter().find(|c| c.trim().eq_ignore_ascii_case(wanted))
    })
}
