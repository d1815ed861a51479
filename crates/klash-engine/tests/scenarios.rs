//! End-to-end resolution scenarios.
//!
//! Each test builds a market request, runs it through `ResolutionEngine` with
//! a scripted or keyword classifier, and checks the emitted record.

use std::sync::Arc;

use klash_classifier::test_support::{KeywordClassifier, ScriptedClassifier};
use klash_classifier::OutcomeClassifier;
use klash_engine::ResolutionEngine;
use klash_models::config::{AggregatorConfig, EngineConfig};
use klash_models::judgment::Judgment;
use klash_models::market::{MarketRequest, ReplyEntry, ReplyItem};
use klash_models::resolution::{ErrorKind, ResolutionRecord, INSUFFICIENT_SENTIMENT_MESSAGE};
use klash_models::team::TeamClassificationRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn engine(classifier: impl OutcomeClassifier + 'static) -> ResolutionEngine {
    ResolutionEngine::new(
        Arc::new(classifier),
        AggregatorConfig::default(),
        EngineConfig::default(),
    )
}

fn yes_no_market(method: &str, replies: Vec<ReplyEntry>) -> MarketRequest {
    MarketRequest {
        market_id: Some("test_market_1".to_string()),
        question: Some("Will Bitcoin hit $100k by the end of 2025?".to_string()),
        outcomes: Some(vec!["Yes".to_string(), "No".to_string()]),
        resolution_method: Some(method.to_string()),
        reply_tweets: replies,
        ..MarketRequest::default()
    }
}

/// Replies "t0".."tN" scripted with the given (label, confidence) judgments.
fn scripted(judgments: &[(&str, Decimal)]) -> (ScriptedClassifier, Vec<ReplyEntry>) {
    let mut classifier = ScriptedClassifier::new();
    let mut replies = Vec::new();
    for (i, (label, confidence)) in judgments.iter().enumerate() {
        let text = format!("t{i}");
        classifier = classifier.judge(&text, label, *confidence);
        replies.push(ReplyItem::new(format!("r{i}"), text).into());
    }
    (classifier, replies)
}

fn expect_decided(record: ResolutionRecord) -> klash_models::DecidedResolution {
    match record {
        ResolutionRecord::Decided(d) => d,
        other => panic!("expected decided record, got {other:?}"),
    }
}

fn expect_pending(record: ResolutionRecord) -> klash_models::PendingResolution {
    match record {
        ResolutionRecord::Pending(p) => p,
        other => panic!("expected pending record, got {other:?}"),
    }
}

// ============================================================
// Scenario: three Yes, two No, all above threshold
// Expected: Yes wins with confidence 0.6
// ============================================================

#[tokio::test]
async fn scenario_majority_yes() {
    let (classifier, replies) = scripted(&[
        ("Yes", dec!(0.9)),
        ("Yes", dec!(0.8)),
        ("Yes", dec!(0.7)),
        ("No", dec!(0.75)),
        ("No", dec!(0.65)),
    ]);

    let decided = expect_decided(
        engine(classifier)
            .resolve(&yes_no_market("sentiment", replies))
            .await,
    );

    assert_eq!(decided.winning_outcome, "Yes");
    assert_eq!(decided.winning_index, 0);
    assert_eq!(decided.total_analyzed, 5);
    assert_eq!(decided.confidence, dec!(0.6));
    assert_eq!(decided.breakdown["Yes"].support_percentage, dec!(60));
    assert_eq!(decided.breakdown["Yes"].avg_confidence, dec!(0.8));
    assert_eq!(decided.breakdown["No"].avg_confidence, dec!(0.7));
    assert!(!decided.dominant);
}

// ============================================================
// Scenario: every reply below the 0.6 threshold
// Expected: pending, insufficient data
// ============================================================

#[tokio::test]
async fn scenario_all_below_threshold_is_pending() {
    let (classifier, replies) = scripted(&[("Yes", dec!(0.4)); 5]);

    let pending = expect_pending(
        engine(classifier)
            .resolve(&yes_no_market("sentiment", replies))
            .await,
    );

    assert_eq!(pending.message, INSUFFICIENT_SENTIMENT_MESSAGE);
    assert_eq!(pending.confidence, Decimal::ZERO);
    assert_eq!(pending.winning_outcome, None);
    assert_eq!(pending.winning_index, -1);
}

#[tokio::test]
async fn pending_when_replies_are_empty_unlabelled_or_low() {
    let classifier = ScriptedClassifier::new()
        .judgment("meh", Judgment::new(None, dec!(0.45)))
        .judge("weak", "No", dec!(0.59))
        .judge("off-topic", "Maybe", dec!(0.95));
    let replies = vec![
        ReplyItem::new("1", "").into(),
        ReplyItem::new("2", "meh").into(),
        ReplyItem::new("3", "weak").into(),
        ReplyItem::new("4", "off-topic").into(),
    ];

    let pending = expect_pending(
        engine(classifier)
            .resolve(&yes_no_market("sentiment", replies))
            .await,
    );
    assert_eq!(pending.message, INSUFFICIENT_SENTIMENT_MESSAGE);
    assert_eq!(pending.confidence, Decimal::ZERO);
}

#[tokio::test]
async fn pending_when_no_replies() {
    let pending = expect_pending(
        engine(ScriptedClassifier::new())
            .resolve(&yes_no_market("sentiment", vec![]))
            .await,
    );
    assert_eq!(pending.message, INSUFFICIENT_SENTIMENT_MESSAGE);
}

// ============================================================
// Scenario: oracle method
// Expected: pending regardless of replies
// ============================================================

#[tokio::test]
async fn scenario_oracle_is_pending() {
    let (classifier, replies) = scripted(&[("Yes", dec!(0.99)); 3]);

    let pending = expect_pending(
        engine(classifier)
            .resolve(&yes_no_market("oracle", replies))
            .await,
    );
    assert_eq!(pending.winning_index, -1);
    assert_eq!(pending.resolution_method.as_str(), "oracle");
}

// ============================================================
// Scenario: a single outcome
// Expected: validation error
// ============================================================

#[tokio::test]
async fn scenario_single_outcome_is_validation_error() {
    let mut market = yes_no_market("sentiment", vec![]);
    market.outcomes = Some(vec!["OnlyOne".to_string()]);

    let record = engine(ScriptedClassifier::new()).resolve(&market).await;
    let ResolutionRecord::Error(failure) = record else {
        panic!("expected error record, got {record:?}");
    };
    assert_eq!(failure.error_kind, ErrorKind::Validation);
    assert!(failure
        .error
        .to_lowercase()
        .contains("at least two outcomes"));
    assert_eq!(failure.market_id.as_deref(), Some("test_market_1"));
}

#[tokio::test]
async fn unsupported_method_is_validation_error() {
    let record = engine(ScriptedClassifier::new())
        .resolve(&yes_no_market("coinflip", vec![]))
        .await;
    let ResolutionRecord::Error(failure) = record else {
        panic!("expected error record, got {record:?}");
    };
    assert_eq!(failure.error_kind, ErrorKind::Validation);
    assert!(failure.error.contains("Unsupported resolution method"));
}

// ============================================================
// Tie-break: equal counts decided by mean confidence, then order
// ============================================================

#[tokio::test]
async fn tie_resolves_to_higher_mean_confidence() {
    let (classifier, replies) = scripted(&[
        ("Yes", dec!(0.7)),
        ("No", dec!(0.9)),
        ("Yes", dec!(0.65)),
        ("No", dec!(0.85)),
    ]);

    let decided = expect_decided(
        engine(classifier)
            .resolve(&yes_no_market("sentiment", replies))
            .await,
    );
    assert_eq!(decided.winning_outcome, "No");
    assert_eq!(decided.winning_index, 1);
    assert_eq!(decided.confidence, dec!(0.5));
}

#[tokio::test]
async fn full_tie_resolves_to_earlier_outcome() {
    let (classifier, replies) = scripted(&[("No", dec!(0.8)), ("Yes", dec!(0.8))]);

    let decided = expect_decided(
        engine(classifier)
            .resolve(&yes_no_market("sentiment", replies))
            .await,
    );
    assert_eq!(decided.winning_outcome, "Yes");
    assert_eq!(decided.winning_index, 0);
}

// ============================================================
// Determinism: reply order does not change the outcome
// ============================================================

#[tokio::test]
async fn resolution_is_order_independent() {
    let judgments = [
        ("Yes", dec!(0.91)),
        ("No", dec!(0.63)),
        ("No", dec!(0.88)),
        ("Yes", dec!(0.61)),
        ("No", dec!(0.42)),
        ("Yes", dec!(0.77)),
        ("No", dec!(0.70)),
    ];
    let (classifier, replies) = scripted(&judgments);
    let engine = engine(classifier);

    let forward = expect_decided(
        engine
            .resolve(&yes_no_market("sentiment", replies.clone()))
            .await,
    );

    let mut reversed = replies;
    reversed.reverse();
    let backward = expect_decided(
        engine
            .resolve(&yes_no_market("sentiment", reversed))
            .await,
    );

    assert_eq!(forward.winning_outcome, backward.winning_outcome);
    assert_eq!(forward.confidence, backward.confidence);
    assert_eq!(forward.breakdown, backward.breakdown);
    assert_eq!(forward.total_analyzed, 6);
    assert_eq!(forward.unclassified_count, 1);
}

#[tokio::test]
async fn percentages_sum_to_one_hundred() {
    let market = MarketRequest {
        market_id: Some("multi".to_string()),
        question: Some("Who wins the league?".to_string()),
        outcomes: Some(vec!["Reds".to_string(), "Blues".to_string(), "Greens".to_string()]),
        resolution_method: Some("sentiment".to_string()),
        reply_tweets: vec![
            ReplyItem::new("1", "Reds all the way").into(),
            ReplyItem::new("2", "Blues in a canter").into(),
            ReplyItem::new("3", "Greens, obviously").into(),
            ReplyItem::new("4", "come on you Reds").into(),
            ReplyItem::new("5", "Blues again").into(),
            ReplyItem::new("6", "Greens!").into(),
            ReplyItem::new("7", "Reds").into(),
        ],
        ..MarketRequest::default()
    };

    let decided = expect_decided(engine(KeywordClassifier::default()).resolve(&market).await);

    let total: Decimal = decided
        .breakdown
        .values()
        .map(|b| b.support_percentage)
        .sum();
    assert!((total - dec!(100)).abs() <= dec!(0.1), "total was {total}");
    assert_eq!(decided.winning_outcome, "Reds");
    assert_eq!(decided.winning_index, 0);
    assert_eq!(decided.breakdown["Reds"].support_percentage, dec!(42.86));
}

// ============================================================
// Supporter cap: 100 highest-confidence supporters retained
// ============================================================

#[tokio::test]
async fn team_supporters_capped_at_one_hundred() {
    let mut classifier = ScriptedClassifier::new();
    let mut tweets = Vec::new();
    for i in 0..120 {
        let text = format!("tweet {i}");
        classifier = classifier.judge(&text, "bull", dec!(0.6) + Decimal::new(i, 3));
        tweets.push(ReplyItem::new(i.to_string(), text).into());
    }
    let request = TeamClassificationRequest {
        controversy: "BTC 100k".to_string(),
        teams: vec!["bull".to_string(), "bear".to_string()],
        tweets,
    };

    let report = engine(classifier).classify_teams(&request).await.unwrap();
    let bull = &report.team_stats["bull"];

    assert_eq!(bull.count, 120);
    assert_eq!(bull.supporters.len(), 100);
    assert_eq!(bull.supporters[0].confidence, dec!(0.719));
    assert_eq!(bull.supporters[0].tweet_id, "119");
    assert_eq!(bull.supporters[99].confidence, dec!(0.620));
    assert!(report.dominant);
    assert_eq!(report.winning_team, "bull");
}

// ============================================================
// Wire shape of emitted records
// ============================================================

#[tokio::test]
async fn emitted_record_json_shape() {
    let market: MarketRequest = serde_json::from_value(serde_json::json!({
        "market_id": "market_json",
        "question": "Will it ship?",
        "outcomes": ["Yes", "No"],
        "resolution_method": "Sentiment",
        "reply_tweets": [
            {"id": 1, "text": "yes it will", "author": "dev"},
            {"id": "2", "text": "no chance"},
            {"id": "3"},
            "garbage"
        ]
    }))
    .unwrap();

    let record = engine(KeywordClassifier::default()).resolve(&market).await;
    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["status"], "decided");
    assert_eq!(value["winning_outcome"], "Yes");
    assert_eq!(value["confidence"], 0.5);
    assert_eq!(value["total_analyzed"], 2);
    assert_eq!(value["failed_count"], 1);
    assert_eq!(value["breakdown"]["No"]["support_count"], 1);
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
}
