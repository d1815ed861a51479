pub mod config;
pub mod judgment;
pub mod market;
pub mod resolution;
pub mod sentiment;
pub mod team;

pub use config::{AggregatorConfig, CacheConfig, ClassifierConfig, EngineConfig, KlashConfig};
pub use judgment::{ClassificationRequest, Judgment};
pub use market::{MarketRequest, ReplyEntry, ReplyItem, ResolutionMethod};
pub use resolution::{
    DecidedResolution, ErrorKind, OutcomeBreakdown, PendingResolution, ResolutionFailure,
    ResolutionRecord,
};
pub use sentiment::{Sentiment, SentimentDetail, SentimentOutcome, SentimentReport};
pub use team::{Supporter, TeamClassificationRequest, TeamReport, TeamStats};
