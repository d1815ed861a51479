use std::time::Duration;

use klash_models::judgment::Judgment;
use moka::future::Cache;
use tracing::trace;

/// Memo key: the exact text and candidate labels a judgment was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JudgmentKey {
    pub text: String,
    pub labels: Vec<String>,
}

impl JudgmentKey {
    pub fn new(text: &str, labels: &[String]) -> Self {
        Self {
            text: text.to_string(),
            labels: labels.to_vec(),
        }
    }
}

/// In-memory judgment memo backed by moka.
///
/// Classification is idempotent for identical input, so a judgment can be
/// reused for repeated (text, labels) pairs across resolutions served by the
/// same process. Entries are evicted after TTL or when capacity is reached.
pub struct JudgmentCache {
    inner: Cache<JudgmentKey, Judgment>,
}

impl JudgmentCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &JudgmentKey) -> Option<Judgment> {
        let hit = self.inner.get(key).await;
        trace!(hit = hit.is_some(), "Judgment cache lookup");
        hit
    }

    pub async fn insert(&self, key: JudgmentKey, judgment: Judgment) {
        self.inner.insert(key, judgment).await;
    }

    pub async fn invalidate(&self, key: &JudgmentKey) {
        self.inner.invalidate(key).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
