use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use klash_classifier::{ClassifierError, OutcomeClassifier};
use klash_models::config::{AggregatorConfig, EngineConfig};
use klash_models::judgment::{ClassificationRequest, Judgment};
use klash_models::market::{MarketRequest, ReplyEntry, ReplyItem, ResolutionMethod};
use klash_models::resolution::*;
use klash_models::sentiment::{
    Sentiment, SentimentDetail, SentimentOutcome, SentimentReport, NO_SENTIMENT_SAMPLE_MESSAGE,
    SENTIMENT_LABELS,
};
use klash_models::team::{TeamClassificationRequest, TeamReport, TeamStats, UNDECIDED_TEAM};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::aggregator::{AggregateResult, Aggregator};
use crate::error::ResolveError;
use crate::outcome::OutcomeSet;
use crate::validation::{validate_labels, validate_market, ValidatedMarket};

/// Judgments gathered for one batch of reply entries, in input order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub judged: Vec<(ReplyItem, Judgment)>,
    /// Items with missing or blank text. Never classified, never counted.
    pub skipped_blank: usize,
    /// Malformed entries plus items whose classification failed or timed out.
    pub failed: usize,
}

/// Resolves markets by classifying their replies and aggregating the judgments.
///
/// Holds no per-market state; one engine serves any number of `resolve` calls
/// and shares its classifier across them.
pub struct ResolutionEngine {
    classifier: Arc<dyn OutcomeClassifier>,
    aggregator: AggregatorConfig,
    item_timeout: Duration,
    max_concurrency: usize,
}

impl ResolutionEngine {
    pub fn new(
        classifier: Arc<dyn OutcomeClassifier>,
        aggregator: AggregatorConfig,
        config: EngineConfig,
    ) -> Self {
        Self {
            classifier,
            aggregator,
            item_timeout: Duration::from_secs(config.item_timeout_seconds),
            max_concurrency: config.max_concurrent_classifications.max(1),
        }
    }

    /// Override the per-item classification timeout.
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn classifier(&self) -> &Arc<dyn OutcomeClassifier> {
        &self.classifier
    }

    /// Resolve one market. Always returns a record; failures become
    /// [`ResolutionRecord::Error`].
    pub async fn resolve(&self, market: &MarketRequest) -> ResolutionRecord {
        let timestamp = Utc::now();
        let start = Instant::now();
        let market_id = market.market_id.as_deref().unwrap_or("unknown");
        info!(
            market_id,
            method = ?market.resolution_method,
            replies = market.reply_tweets.len(),
            "Starting resolution"
        );

        match self.try_resolve(market, timestamp).await {
            Ok(record) => {
                info!(
                    market_id,
                    status = record.status(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Resolution complete"
                );
                record
            }
            Err(e) => {
                error!(
                    market_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Resolution failed"
                );
                ResolutionRecord::Error(ResolutionFailure {
                    market_id: market.market_id.clone(),
                    question: market.question.clone(),
                    outcomes: market.outcomes.clone(),
                    error: e.to_string(),
                    error_kind: e.kind(),
                    timestamp,
                })
            }
        }
    }

    async fn try_resolve(
        &self,
        market: &MarketRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<ResolutionRecord, ResolveError> {
        let validated = validate_market(market)?;

        match validated.method {
            ResolutionMethod::Sentiment => {
                self.resolve_by_sentiment(validated, &market.reply_tweets, timestamp)
                    .await
            }
            ResolutionMethod::Oracle => {
                Ok(pending(validated, ORACLE_PENDING_MESSAGE, timestamp))
            }
            ResolutionMethod::Manual => {
                Ok(pending(validated, MANUAL_PENDING_MESSAGE, timestamp))
            }
        }
    }

    async fn resolve_by_sentiment(
        &self,
        market: ValidatedMarket,
        entries: &[ReplyEntry],
        timestamp: DateTime<Utc>,
    ) -> Result<ResolutionRecord, ResolveError> {
        self.classifier.initialize().await?;

        let batch = self.classify_entries(&market.outcomes, entries).await;
        let mut aggregator = Aggregator::new(market.outcomes.clone(), self.aggregator.clone());
        for (item, judgment) in &batch.judged {
            if let Err(reason) = aggregator.accumulate(item, judgment) {
                debug!(
                    item_id = %item.id,
                    ?reason,
                    confidence = %judgment.confidence,
                    "Judgment not counted"
                );
            }
        }
        let result = aggregator.finalize();

        let Some(winner) = result.winner.clone() else {
            info!(
                market_id = %market.market_id,
                unclassified = result.unclassified_count,
                failed = batch.failed,
                skipped = batch.skipped_blank,
                "No judgment cleared the threshold"
            );
            return Ok(pending(market, INSUFFICIENT_SENTIMENT_MESSAGE, timestamp));
        };

        if result.dominant {
            info!(
                market_id = %market.market_id,
                winner = %winner.outcome,
                "Single outcome dominance detected"
            );
        }

        let winning_index = market.outcomes.index_of(&winner.outcome).ok_or_else(|| {
            ResolveError::Internal(format!("winner {} missing from outcome set", winner.outcome))
        })?;

        Ok(ResolutionRecord::Decided(DecidedResolution {
            market_id: market.market_id,
            question: market.question,
            outcomes: market.outcomes.to_vec(),
            winning_outcome: winner.outcome,
            winning_index,
            confidence: result.winner_share(),
            resolution_method: ResolutionMethod::Sentiment,
            breakdown: breakdown(&result),
            total_analyzed: result.total_analyzed,
            unclassified_count: result.unclassified_count,
            failed_count: batch.failed,
            dominant: result.dominant,
            timestamp,
        }))
    }

    /// Classify every usable entry against `outcomes`.
    ///
    /// Calls run concurrently up to the engine's concurrency limit, each under
    /// the per-item timeout. A failed, timed-out or panicking call only drops
    /// its own item.
    pub async fn classify_entries(
        &self,
        outcomes: &OutcomeSet,
        entries: &[ReplyEntry],
    ) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch::default();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            let item = match entry {
                ReplyEntry::Item(item) => item,
                ReplyEntry::Malformed(value) => {
                    warn!(position, entry = %value, "Skipping malformed reply entry");
                    batch.failed += 1;
                    continue;
                }
            };
            let Some(text) = item.usable_text() else {
                debug!(item_id = %item.id, "Skipping reply without text");
                batch.skipped_blank += 1;
                continue;
            };

            let request = ClassificationRequest::new(item.id.clone(), text, outcomes.as_slice());
            let classifier = Arc::clone(&self.classifier);
            let permits = Arc::clone(&permits);
            let timeout = self.item_timeout;

            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|_| {
                    ClassifierError::Unavailable("classification queue closed".to_string())
                })?;
                tokio::time::timeout(timeout, classifier.classify(&request))
                    .await
                    .map_err(|_| ClassifierError::Timeout(timeout.as_secs()))?
            });
            handles.push((item.clone(), handle));
        }

        for (item, handle) in handles {
            match handle.await {
                Ok(Ok(judgment)) => batch.judged.push((item, judgment)),
                Ok(Err(e)) => {
                    warn!(item_id = %item.id, error = %e, "Classification failed");
                    batch.failed += 1;
                }
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "Classification task panicked");
                    batch.failed += 1;
                }
            }
        }

        debug!(
            judged = batch.judged.len(),
            failed = batch.failed,
            skipped = batch.skipped_blank,
            "Classification batch finished"
        );
        batch
    }

    /// Split tweets into teams around a controversy.
    ///
    /// Items whose classification fails count as unclassified here, since the
    /// report describes every tweet that could not be placed on a team.
    pub async fn classify_teams(
        &self,
        request: &TeamClassificationRequest,
    ) -> Result<TeamReport, ResolveError> {
        let teams = validate_labels(request.teams.clone(), "team labels", "team")?;
        self.classifier.initialize().await?;
        info!(
            controversy = %request.controversy,
            teams = teams.as_slice().len(),
            tweets = request.tweets.len(),
            "Classifying teams"
        );

        let batch = self.classify_entries(&teams, &request.tweets).await;
        let mut aggregator = Aggregator::new(teams, self.aggregator.clone());
        for (item, judgment) in &batch.judged {
            let _ = aggregator.accumulate(item, judgment);
        }
        for _ in 0..batch.failed {
            aggregator.record_unclassified();
        }
        let result = aggregator.finalize();

        if result.dominant {
            if let Some(w) = &result.winner {
                info!(team = %w.outcome, "Single team dominance detected");
            }
        }

        let team_stats = result
            .summaries
            .iter()
            .map(|s| {
                (
                    s.outcome.clone(),
                    TeamStats {
                        count: s.count,
                        percentage: s.support_percentage,
                        avg_confidence: s.avg_confidence,
                        supporters: s.supporters.clone(),
                    },
                )
            })
            .collect();

        Ok(TeamReport {
            controversy: request.controversy.clone(),
            winning_team: result
                .winner
                .as_ref()
                .map(|w| w.outcome.clone())
                .unwrap_or_else(|| UNDECIDED_TEAM.to_string()),
            team_stats,
            total_classified: result.total_analyzed,
            unclassified_count: result.unclassified_count,
            dominant: result.dominant,
        })
    }

    /// Score the polarity of each tweet and summarize the batch.
    ///
    /// A judged tweet contributes its sentiment's sign times its confidence;
    /// unlabelled judgments count as neutral. Tweets without text are
    /// skipped and failed classifications are only counted.
    pub async fn analyze_sentiment(
        &self,
        tweets: &[ReplyEntry],
    ) -> Result<SentimentReport, ResolveError> {
        let labels = OutcomeSet::new(SENTIMENT_LABELS.iter().map(|l| l.to_string()).collect())
            .map_err(|e| ResolveError::Internal(e.to_string()))?;
        self.classifier.initialize().await?;
        info!(tweets = tweets.len(), "Analyzing sentiment");

        let batch = self.classify_entries(&labels, tweets).await;
        if batch.judged.is_empty() {
            return Err(ResolveError::validation(NO_SENTIMENT_SAMPLE_MESSAGE));
        }

        let detailed_sentiments: Vec<SentimentDetail> = batch
            .judged
            .iter()
            .map(|(item, judgment)| {
                let sentiment = Sentiment::from_label(judgment.label.as_deref());
                SentimentDetail {
                    tweet_id: item.id.clone(),
                    text: item.text.clone().unwrap_or_default(),
                    sentiment,
                    confidence: judgment.confidence,
                    polarity: sentiment.sign() * judgment.confidence,
                }
            })
            .collect();

        let sample = Decimal::from(detailed_sentiments.len());
        let avg_polarity = detailed_sentiments
            .iter()
            .map(|d| d.polarity)
            .sum::<Decimal>()
            / sample;
        let avg_confidence = detailed_sentiments
            .iter()
            .map(|d| d.confidence)
            .sum::<Decimal>()
            / sample;
        let outcome =
            SentimentOutcome::from_polarity(avg_polarity, self.aggregator.polarity_threshold);

        info!(
            ?outcome,
            avg_polarity = %avg_polarity.round_dp(4),
            sample_size = detailed_sentiments.len(),
            failed = batch.failed,
            "Sentiment analysis complete"
        );

        Ok(SentimentReport {
            outcome,
            avg_polarity: avg_polarity.round_dp(4),
            avg_confidence: avg_confidence.round_dp(4),
            sample_size: detailed_sentiments.len(),
            failed_count: batch.failed,
            detailed_sentiments,
        })
    }
}

fn pending(market: ValidatedMarket, message: &str, timestamp: DateTime<Utc>) -> ResolutionRecord {
    ResolutionRecord::Pending(PendingResolution::new(
        market.market_id,
        market.question,
        market.outcomes.to_vec(),
        market.method,
        message,
        timestamp,
    ))
}

fn breakdown(result: &AggregateResult) -> BTreeMap<String, OutcomeBreakdown> {
    result
        .summaries
        .iter()
        .map(|s| {
            (
                s.outcome.clone(),
                OutcomeBreakdown {
                    support_count: s.count,
                    support_percentage: s.support_percentage,
                    avg_confidence: s.avg_confidence,
                },
            )
        })
        .collect()
}
