use std::time::Duration;

use async_trait::async_trait;
use klash_cache::{JudgmentCache, JudgmentKey};
use klash_models::config::ClassifierConfig;
use klash_models::judgment::{ClassificationRequest, Judgment};
use rust_decimal::Decimal;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig};
use crate::error::ClassifierError;
use crate::parser::parse_judgment;
use crate::prompts::classification_system_prompt;

/// A capability that maps (text, candidate labels) to a [`Judgment`].
/// Mockable for testing.
#[async_trait]
pub trait OutcomeClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// One-time setup before the first classification. Called by the engine
    /// on every sentiment resolution, so implementations must make repeat
    /// calls cheap.
    async fn initialize(&self) -> Result<(), ClassifierError> {
        Ok(())
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError>;
}

/// Zero-shot classifier that asks the Claude CLI to score each label.
pub struct ClaudeClassifier {
    pub cli_config: ClaudeCliConfig,
    pub acceptance_threshold: Decimal,
    system_prompt: String,
    ready: OnceCell<()>,
}

impl ClaudeClassifier {
    pub fn new(cli_config: ClaudeCliConfig, acceptance_threshold: Decimal) -> Self {
        Self {
            cli_config,
            acceptance_threshold,
            system_prompt: classification_system_prompt(),
            ready: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            ClaudeCliConfig {
                program: config.cli_path.clone(),
                model: config.model.clone(),
                timeout: Duration::from_secs(config.timeout_seconds),
            },
            config.acceptance_threshold,
        )
    }
}

#[async_trait]
impl OutcomeClassifier for ClaudeClassifier {
    fn name(&self) -> &str {
        "claude"
    }

    async fn initialize(&self) -> Result<(), ClassifierError> {
        self.ready
            .get_or_try_init(|| async {
                if check_cli_available(&self.cli_config.program).await {
                    info!(
                        program = %self.cli_config.program,
                        model = %self.cli_config.model,
                        "Claude classifier ready"
                    );
                    Ok(())
                } else {
                    Err(ClassifierError::Unavailable(format!(
                        "`{} --version` failed; is the CLI installed and on PATH?",
                        self.cli_config.program
                    )))
                }
            })
            .await
            .map(|_| ())
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError> {
        let user_prompt = serde_json::to_string(request)?;
        let raw = invoke_claude(&self.system_prompt, &user_prompt, &self.cli_config).await?;
        parse_judgment(&raw, &request.candidate_labels, self.acceptance_threshold)
    }
}

/// Memoizes another classifier's judgments. Failures are never cached.
pub struct CachedClassifier<C> {
    inner: C,
    cache: JudgmentCache,
}

impl<C: OutcomeClassifier> CachedClassifier<C> {
    pub fn new(inner: C, cache: JudgmentCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: OutcomeClassifier> OutcomeClassifier for CachedClassifier<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn initialize(&self) -> Result<(), ClassifierError> {
        self.inner.initialize().await
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Judgment, ClassifierError> {
        let key = JudgmentKey::new(&request.text, &request.candidate_labels);
        if let Some(judgment) = self.cache.get(&key).await {
            debug!(item_id = %request.item_id, "Judgment served from cache");
            return Ok(judgment);
        }

        let judgment = self.inner.classify(request).await?;
        self.cache.insert(key, judgment.clone()).await;
        debug!(item_id = %request.item_id, entries = self.cache.entry_count(), "Judgment cached");
        Ok(judgment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedClassifier;
    use rust_decimal_macros::dec;

    fn yes_no() -> Vec<String> {
        vec!["Yes".to_string(), "No".to_string()]
    }

    #[tokio::test]
    async fn cached_classifier_reuses_judgments() {
        let scripted = ScriptedClassifier::new().judge("to the moon", "Yes", dec!(0.9));
        let cache = JudgmentCache::new(100, Duration::from_secs(60));
        let cached = CachedClassifier::new(scripted, cache);

        let first = cached
            .classify(&ClassificationRequest::new("1", "to the moon", &yes_no()))
            .await
            .unwrap();
        let second = cached
            .classify(&ClassificationRequest::new("2", "to the moon", &yes_no()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().calls(), 1);
    }

    #[tokio::test]
    async fn cached_classifier_does_not_cache_failures() {
        let scripted = ScriptedClassifier::new().fail("boom", "model crashed");
        let cache = JudgmentCache::new(100, Duration::from_secs(60));
        let cached = CachedClassifier::new(scripted, cache);

        for id in ["1", "2"] {
            let result = cached
                .classify(&ClassificationRequest::new(id, "boom", &yes_no()))
                .await;
            assert!(result.is_err());
        }
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn claude_classifier_unavailable_binary() {
        let config = ClassifierConfig {
            cli_path: "klash-no-such-binary-7f3a".to_string(),
            ..ClassifierConfig::default()
        };
        let classifier = ClaudeClassifier::from_config(&config);

        let result = classifier.initialize().await;
        assert!(matches!(result, Err(ClassifierError::Unavailable(_))));
    }

    #[test]
    fn claude_classifier_from_config() {
        let classifier = ClaudeClassifier::from_config(&ClassifierConfig::default());
        assert_eq!(classifier.cli_config.model, "claude-3-5-haiku-latest");
        assert_eq!(classifier.cli_config.timeout, Duration::from_secs(30));
        assert_eq!(classifier.acceptance_threshold, dec!(0.5));
        assert_eq!(classifier.name(), "claude");
    }
}
