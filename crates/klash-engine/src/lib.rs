pub mod aggregator;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod validation;

pub use aggregator::{accumulate, AggregateResult, Aggregator, OutcomeSummary, Rejection, Winner};
pub use engine::{ClassifiedBatch, ResolutionEngine};
pub use error::ResolveError;
pub use outcome::{OutcomeSet, OutcomeSetError};
pub use validation::{validate_market, ValidatedMarket};
