pub mod memory;

pub use memory::{JudgmentCache, JudgmentKey};
