use klash_models::market::{MarketRequest, ResolutionMethod};

use crate::error::ResolveError;
use crate::outcome::{OutcomeSet, OutcomeSetError};

/// A market request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMarket {
    pub market_id: String,
    pub question: String,
    pub outcomes: OutcomeSet,
    pub method: ResolutionMethod,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ResolveError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ResolveError::validation(format!("Missing required field: {field}")))
}

/// Check a request before any classification work starts.
pub fn validate_market(market: &MarketRequest) -> Result<ValidatedMarket, ResolveError> {
    let market_id = required(&market.market_id, "market_id")?;
    let question = required(&market.question, "question")?;
    let outcomes = market
        .outcomes
        .clone()
        .ok_or_else(|| ResolveError::validation("Missing required field: outcomes"))?;
    let method = required(&market.resolution_method, "resolution_method")?;

    let outcomes = validate_labels(outcomes, "outcomes", "outcome")?;
    let method = ResolutionMethod::parse(method).ok_or_else(|| {
        ResolveError::validation(format!("Unsupported resolution method: {}", method.trim()))
    })?;

    Ok(ValidatedMarket {
        market_id: market_id.to_string(),
        question: question.to_string(),
        outcomes,
        method,
    })
}

/// Build an [`OutcomeSet`], phrasing failures with the caller's nouns.
pub fn validate_labels(
    labels: Vec<String>,
    plural: &str,
    singular: &str,
) -> Result<OutcomeSet, ResolveError> {
    OutcomeSet::new(labels).map_err(|e| match e {
        OutcomeSetError::TooFew => {
            ResolveError::validation(format!("At least two {plural} are required"))
        }
        OutcomeSetError::Blank => {
            ResolveError::validation(format!("Blank {singular} label"))
        }
        OutcomeSetError::Duplicate(label) => {
            ResolveError::validation(format!("Duplicate {singular}: {label}"))
        }
    })
}
