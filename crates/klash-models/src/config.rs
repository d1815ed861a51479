use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for Klash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KlashConfig {
    pub aggregator: AggregatorConfig,
    pub engine: EngineConfig,
    pub classifier: ClassifierConfig,
    pub cache: CacheConfig,
}

/// Thresholds applied when tallying judgments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Judgments below this confidence are treated as unclassified.
    pub min_confidence: Decimal,
    /// Winner share of analyzed items at or above which the result is dominant.
    pub dominance_threshold: Decimal,
    /// Supporters retained per outcome.
    pub max_supporters: usize,
    /// Mean polarity beyond which a sentiment batch is positive or negative.
    pub polarity_threshold: Decimal,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: Decimal::new(6, 1),
            dominance_threshold: Decimal::new(95, 2),
            max_supporters: 100,
            polarity_threshold: Decimal::new(3, 1),
        }
    }
}

/// Configuration for the resolution engine's classification fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-item classification timeout in seconds.
    pub item_timeout_seconds: u64,
    /// Maximum classifications in flight for one resolution.
    pub max_concurrent_classifications: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            item_timeout_seconds: 30,
            max_concurrent_classifications: 8,
        }
    }
}

/// Configuration for the Claude-backed zero-shot classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Program name or path of the `claude` CLI.
    pub cli_path: String,
    pub model: String,
    /// Timeout for one CLI invocation in seconds.
    pub timeout_seconds: u64,
    /// Best-label score below which a judgment carries no label.
    pub acceptance_threshold: Decimal,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cli_path: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_seconds: 30,
            acceptance_threshold: Decimal::new(5, 1),
        }
    }
}

/// Configuration for the in-memory judgment memo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of memoized judgments.
    pub memory_max_capacity: u64,
    /// How long a memoized judgment is reused, in seconds.
    pub memory_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_max_capacity: 10_000,
            memory_ttl_seconds: 3_600,
        }
    }
}
