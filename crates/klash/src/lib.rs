//! Klash - prediction market resolution from reply sentiment
//!
//! Resolves a market by classifying each reply tweet against the market's
//! outcomes with a zero-shot classifier, then aggregating the judgments into
//! a decided, pending or error record.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use klash::models::{KlashConfig, MarketRequest, ResolutionRecord};
//!
//! # async fn run(market: MarketRequest) {
//! let engine = klash::build_engine(&KlashConfig::default());
//! match klash::resolve(&engine, &market).await {
//!     ResolutionRecord::Decided(d) => println!("{} wins", d.winning_outcome),
//!     ResolutionRecord::Pending(p) => println!("pending: {}", p.message),
//!     ResolutionRecord::Error(e) => eprintln!("failed: {}", e.error),
//! }
//! # }
//! ```

pub use klash_cache as cache;
pub use klash_classifier as classifier;
pub use klash_engine as engine;
pub use klash_models as models;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use klash_cache::JudgmentCache;
use klash_classifier::{CachedClassifier, ClaudeClassifier, OutcomeClassifier};
use klash_engine::{ResolutionEngine, ResolveError};
use klash_models::config::KlashConfig;
use klash_models::market::{MarketRequest, ReplyEntry};
use klash_models::resolution::{ErrorKind, ResolutionFailure, ResolutionRecord};
use klash_models::sentiment::SentimentReport;
use klash_models::team::{TeamClassificationRequest, TeamReport};

/// Build the Claude-backed classifier described by `config`, memoized when
/// the cache is enabled.
pub fn build_classifier(config: &KlashConfig) -> Arc<dyn OutcomeClassifier> {
    let claude = ClaudeClassifier::from_config(&config.classifier);
    if !config.cache.enabled {
        return Arc::new(claude);
    }

    let cache = JudgmentCache::new(
        config.cache.memory_max_capacity,
        Duration::from_secs(config.cache.memory_ttl_seconds),
    );
    Arc::new(CachedClassifier::new(claude, cache))
}

/// Build a ResolutionEngine from configuration.
pub fn build_engine(config: &KlashConfig) -> ResolutionEngine {
    build_engine_with(config, build_classifier(config))
}

/// Build a ResolutionEngine around an existing classifier.
pub fn build_engine_with(
    config: &KlashConfig,
    classifier: Arc<dyn OutcomeClassifier>,
) -> ResolutionEngine {
    ResolutionEngine::new(classifier, config.aggregator.clone(), config.engine.clone())
}

/// Resolve a market using the given engine.
pub async fn resolve(engine: &ResolutionEngine, market: &MarketRequest) -> ResolutionRecord {
    engine.resolve(market).await
}

/// Resolve a market request given as raw JSON text.
///
/// Unreadable input still produces an error record; when the text is JSON
/// but not a valid request, any identifiers it carries are kept.
pub async fn resolve_json(engine: &ResolutionEngine, input: &str) -> ResolutionRecord {
    resolve_input(engine, input.as_bytes()).await
}

/// Resolve a market request given as raw bytes, as read from stdin or a file.
pub async fn resolve_input(engine: &ResolutionEngine, input: &[u8]) -> ResolutionRecord {
    match parse_market(input) {
        Ok(market) => engine.resolve(&market).await,
        Err(failure) => ResolutionRecord::Error(failure),
    }
}

fn invalid_input(error: String) -> ResolutionFailure {
    ResolutionFailure::bare(error, ErrorKind::Validation, Utc::now())
}

/// Decode and parse top-level JSON input.
fn parse_value(input: &[u8]) -> Result<serde_json::Value, ResolutionFailure> {
    let text = std::str::from_utf8(input)
        .map_err(|e| invalid_input(format!("Input is not valid UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(invalid_input("No input provided".to_string()));
    }
    serde_json::from_str(text).map_err(|e| invalid_input(format!("Invalid JSON input: {e}")))
}

fn parse_market(input: &[u8]) -> Result<MarketRequest, ResolutionFailure> {
    let now = Utc::now();
    let value = parse_value(input)?;

    serde_json::from_value::<MarketRequest>(value.clone()).map_err(|e| ResolutionFailure {
        market_id: string_field(&value, "market_id"),
        question: string_field(&value, "question"),
        outcomes: value
            .get("outcomes")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        error: format!("Malformed market request: {e}"),
        error_kind: ErrorKind::Validation,
        timestamp: now,
    })
}

fn string_field(value: &serde_json::Value, field: &str) -> Option<String> {
    value.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

/// Split tweets into teams using the given engine.
pub async fn classify_teams(
    engine: &ResolutionEngine,
    request: &TeamClassificationRequest,
) -> Result<TeamReport, ResolveError> {
    engine.classify_teams(request).await
}

/// Split tweets into teams from raw request bytes. Every failure is returned
/// as an error payload ready to print.
pub async fn classify_teams_input(
    engine: &ResolutionEngine,
    input: &[u8],
) -> Result<TeamReport, ResolutionFailure> {
    let request: TeamClassificationRequest = serde_json::from_value(parse_value(input)?)
        .map_err(|e| invalid_input(format!("Malformed team request: {e}")))?;
    engine.classify_teams(&request).await.map_err(failure)
}

/// Summarize the polarity of a batch of tweets.
pub async fn analyze_sentiment(
    engine: &ResolutionEngine,
    tweets: &[ReplyEntry],
) -> Result<SentimentReport, ResolveError> {
    engine.analyze_sentiment(tweets).await
}

/// Summarize polarity from raw input: a JSON array of tweets, or a single
/// tweet object.
pub async fn analyze_sentiment_input(
    engine: &ResolutionEngine,
    input: &[u8],
) -> Result<SentimentReport, ResolutionFailure> {
    let value = parse_value(input)?;
    let tweets = match value {
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<ReplyEntry>>(value),
        single => serde_json::from_value::<ReplyEntry>(single).map(|tweet| vec![tweet]),
    }
    .map_err(|e| invalid_input(format!("Malformed tweet list: {e}")))?;
    engine.analyze_sentiment(&tweets).await.map_err(failure)
}

fn failure(e: ResolveError) -> ResolutionFailure {
    ResolutionFailure::bare(e.to_string(), e.kind(), Utc::now())
}
