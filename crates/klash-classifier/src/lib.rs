pub mod claude_cli;
pub mod classifier;
pub mod error;
pub mod parser;
pub mod prompts;

pub mod test_support;

pub use classifier::{CachedClassifier, ClaudeClassifier, OutcomeClassifier};
pub use error::ClassifierError;
