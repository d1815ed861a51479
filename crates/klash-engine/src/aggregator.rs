//! Tally-and-rank over classification judgments.
//!
//! The aggregator knows nothing about markets: it counts accepted judgments
//! per outcome, picks a winner by `(count desc, mean confidence desc,
//! declared index asc)`, and reports per-outcome statistics. Accumulation is
//! commutative, so the winner and every count, sum and percentage are
//! independent of the order judgments arrive in. Only supporter order among
//! equal confidences follows arrival order.

use klash_models::config::AggregatorConfig;
use klash_models::judgment::Judgment;
use klash_models::market::ReplyItem;
use klash_models::team::Supporter;
use rust_decimal::Decimal;

use crate::outcome::OutcomeSet;

#[derive(Debug, Clone, Default)]
struct Tally {
    count: usize,
    confidence_sum: Decimal,
    supporters: Vec<Supporter>,
}

impl Tally {
    fn mean_confidence(&self) -> Decimal {
        if self.count == 0 {
            Decimal::ZERO
        } else {
            self.confidence_sum / Decimal::from(self.count)
        }
    }
}

/// Why a judgment did not count towards any outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoLabel,
    BelowThreshold,
    UnknownLabel,
}

/// Accumulates judgments for a fixed outcome set.
#[derive(Debug, Clone)]
pub struct Aggregator {
    outcomes: OutcomeSet,
    config: AggregatorConfig,
    tallies: Vec<Tally>,
    unclassified: usize,
}

impl Aggregator {
    pub fn new(outcomes: OutcomeSet, config: AggregatorConfig) -> Self {
        let tallies = vec![Tally::default(); outcomes.as_slice().len()];
        Self {
            outcomes,
            config,
            tallies,
            unclassified: 0,
        }
    }

    /// Count one judgment for `item`. Returns the accepted outcome's index,
    /// or why the judgment was counted as unclassified instead.
    pub fn accumulate(
        &mut self,
        item: &ReplyItem,
        judgment: &Judgment,
    ) -> Result<usize, Rejection> {
        let outcome = match self.accept(judgment) {
            Ok(index) => index,
            Err(rejection) => {
                self.unclassified += 1;
                return Err(rejection);
            }
        };

        let tally = &mut self.tallies[outcome];
        tally.count += 1;
        tally.confidence_sum += judgment.confidence;
        tally.supporters.push(Supporter {
            tweet_id: item.id.clone(),
            author: item.author.clone().unwrap_or_else(|| "unknown".to_string()),
            text: item.text.clone().unwrap_or_default(),
            confidence: judgment.confidence,
        });

        Ok(outcome)
    }

    /// Count an item that produced no judgment at all.
    pub fn record_unclassified(&mut self) {
        self.unclassified += 1;
    }

    fn accept(&self, judgment: &Judgment) -> Result<usize, Rejection> {
        let label = judgment.label.as_deref().ok_or(Rejection::NoLabel)?;
        if judgment.confidence < self.config.min_confidence {
            return Err(Rejection::BelowThreshold);
        }
        self.outcomes.index_of(label).ok_or(Rejection::UnknownLabel)
    }

    pub fn total_analyzed(&self) -> usize {
        self.tallies.iter().map(|t| t.count).sum()
    }

    /// Outcome indices, best first.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tallies.len()).collect();
        order.sort_by(|&a, &b| {
            let (ta, tb) = (&self.tallies[a], &self.tallies[b]);
            tb.count
                .cmp(&ta.count)
                // Counts are equal here, so comparing sums compares means exactly.
                .then_with(|| tb.confidence_sum.cmp(&ta.confidence_sum))
                .then_with(|| a.cmp(&b))
        });
        order
    }

    pub fn finalize(self) -> AggregateResult {
        let total_analyzed = self.total_analyzed();
        let ranking = self.ranking();

        let winner = ranking
            .first()
            .map(|&index| (index, &self.tallies[index]))
            .filter(|(_, tally)| tally.count > 0)
            .map(|(index, tally)| Winner {
                outcome: self.outcomes.as_slice()[index].clone(),
                index,
                count: tally.count,
                avg_confidence: tally.mean_confidence().round_dp(4),
            });

        let dominant = winner.as_ref().is_some_and(|w| {
            let share_needed = self.config.dominance_threshold * Decimal::from(total_analyzed);
            Decimal::from(w.count) >= share_needed
        });

        let max_supporters = self.config.max_supporters;
        let summaries = self
            .outcomes
            .as_slice()
            .iter()
            .zip(self.tallies)
            .enumerate()
            .map(|(index, (outcome, tally))| {
                let support_percentage = if total_analyzed == 0 {
                    Decimal::ZERO
                } else {
                    (Decimal::from(tally.count) * Decimal::ONE_HUNDRED
                        / Decimal::from(total_analyzed))
                    .round_dp(2)
                };
                let avg_confidence = tally.mean_confidence().round_dp(4);

                let mut supporters = tally.supporters;
                // Stable: equal confidences keep arrival order.
                supporters.sort_by(|a, b| b.confidence.cmp(&a.confidence));
                supporters.truncate(max_supporters);

                OutcomeSummary {
                    outcome: outcome.clone(),
                    index,
                    count: tally.count,
                    confidence_sum: tally.confidence_sum,
                    support_percentage,
                    avg_confidence,
                    supporters,
                }
            })
            .collect();

        AggregateResult {
            summaries,
            ranking,
            total_analyzed,
            unclassified_count: self.unclassified,
            winner,
            dominant,
        }
    }
}

/// Tally a whole batch in one call.
pub fn accumulate<'a, I>(
    outcomes: &OutcomeSet,
    judgments: I,
    config: &AggregatorConfig,
) -> AggregateResult
where
    I: IntoIterator<Item = (&'a ReplyItem, &'a Judgment)>,
{
    let mut aggregator = Aggregator::new(outcomes.clone(), config.clone());
    for (item, judgment) in judgments {
        let _ = aggregator.accumulate(item, judgment);
    }
    aggregator.finalize()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub outcome: String,
    pub index: usize,
    pub count: usize,
    pub avg_confidence: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeSummary {
    pub outcome: String,
    pub index: usize,
    pub count: usize,
    pub confidence_sum: Decimal,
    /// Share of analyzed items, 0-100, two decimal places.
    pub support_percentage: Decimal,
    /// Mean supporter confidence, four decimal places. Zero when `count == 0`.
    pub avg_confidence: Decimal,
    /// Highest confidence first, capped at `max_supporters`.
    pub supporters: Vec<Supporter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// One entry per outcome, in declared order.
    pub summaries: Vec<OutcomeSummary>,
    /// Outcome indices ordered best first.
    pub ranking: Vec<usize>,
    pub total_analyzed: usize,
    pub unclassified_count: usize,
    /// `None` when nothing was accepted.
    pub winner: Option<Winner>,
    pub dominant: bool,
}

impl AggregateResult {
    /// Winner's share of analyzed items, four decimal places.
    pub fn winner_share(&self) -> Decimal {
        match &self.winner {
            Some(w) if self.total_analyzed > 0 => {
                (Decimal::from(w.count) / Decimal::from(self.total_analyzed)).round_dp(4)
            }
            _ => Decimal::ZERO,
        }
    }

    pub fn summary(&self, outcome: &str) -> Option<&OutcomeSummary> {
        self.summaries.iter().find(|s| s.outcome == outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn outcomes(raw: &[&str]) -> OutcomeSet {
        OutcomeSet::new(raw.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn item(id: usize) -> ReplyItem {
        ReplyItem::new(id.to_string(), format!("reply {id}")).with_author(format!("user{id}"))
    }

    fn run(set: &OutcomeSet, judgments: &[Judgment]) -> AggregateResult {
        let items: Vec<ReplyItem> = (0..judgments.len()).map(item).collect();
        accumulate(set, items.iter().zip(judgments), &AggregatorConfig::default())
    }

    fn yes(c: Decimal) -> Judgment {
        Judgment::labelled("Yes", c)
    }

    fn no(c: Decimal) -> Judgment {
        Judgment::labelled("No", c)
    }

    #[test]
    fn majority_wins_with_statistics() {
        let set = outcomes(&["Yes", "No"]);
        let result = run(
            &set,
            &[yes(dec!(0.9)), yes(dec!(0.8)), yes(dec!(0.7)), no(dec!(0.75)), no(dec!(0.65))],
        );

        let winner = result.winner.as_ref().unwrap();
        assert_eq!(winner.outcome, "Yes");
        assert_eq!(winner.index, 0);
        assert_eq!(result.total_analyzed, 5);
        assert_eq!(result.winner_share(), dec!(0.6));
        assert!(!result.dominant);

        let yes_summary = result.summary("Yes").unwrap();
        assert_eq!(yes_summary.count, 3);
        assert_eq!(yes_summary.support_percentage, dec!(60));
        assert_eq!(yes_summary.avg_confidence, dec!(0.8));

        let no_summary = result.summary("No").unwrap();
        assert_eq!(no_summary.support_percentage, dec!(40));
        assert_eq!(no_summary.avg_confidence, dec!(0.7));
    }

    #[test]
    fn below_threshold_never_counts() {
        let set = outcomes(&["Yes", "No"]);
        let result = run(&set, &[yes(dec!(0.59)), no(dec!(0.6)), yes(dec!(0.5999))]);

        assert_eq!(result.summary("Yes").unwrap().count, 0);
        assert_eq!(result.summary("Yes").unwrap().confidence_sum, Decimal::ZERO);
        assert_eq!(result.summary("No").unwrap().count, 1);
        assert_eq!(result.unclassified_count, 2);
        assert_eq!(result.winner.unwrap().outcome, "No");
    }

    #[test]
    fn rejections_are_reported() {
        let set = outcomes(&["Yes", "No"]);
        let mut aggregator = Aggregator::new(set, AggregatorConfig::default());
        let it = item(0);

        assert_eq!(
            aggregator.accumulate(&it, &Judgment::new(None, dec!(0.9))),
            Err(Rejection::NoLabel)
        );
        assert_eq!(
            aggregator.accumulate(&it, &yes(dec!(0.3))),
            Err(Rejection::BelowThreshold)
        );
        assert_eq!(
            aggregator.accumulate(&it, &Judgment::labelled("Maybe", dec!(0.9))),
            Err(Rejection::UnknownLabel)
        );
        assert_eq!(aggregator.accumulate(&it, &no(dec!(0.9))), Ok(1));
        aggregator.record_unclassified();

        let result = aggregator.finalize();
        assert_eq!(result.unclassified_count, 4);
        assert_eq!(result.total_analyzed, 1);
    }

    #[test]
    fn nothing_accepted_means_no_winner() {
        let set = outcomes(&["Yes", "No"]);
        let result = run(&set, &[yes(dec!(0.4)), no(dec!(0.4)), yes(dec!(0.4))]);

        assert!(result.winner.is_none());
        assert_eq!(result.total_analyzed, 0);
        assert_eq!(result.winner_share(), Decimal::ZERO);
        assert!(!result.dominant);
        for summary in &result.summaries {
            assert_eq!(summary.support_percentage, Decimal::ZERO);
            assert_eq!(summary.avg_confidence, Decimal::ZERO);
        }

        let empty = run(&set, &[]);
        assert!(empty.winner.is_none());
    }

    #[test]
    fn tie_on_count_breaks_on_mean_confidence() {
        let set = outcomes(&["Yes", "No"]);
        let result = run(&set, &[yes(dec!(0.7)), no(dec!(0.9)), yes(dec!(0.7)), no(dec!(0.8))]);
        assert_eq!(result.winner.unwrap().outcome, "No");
        assert_eq!(result.ranking, vec![1, 0]);
    }

    #[test]
    fn full_tie_prefers_declared_order() {
        let set = outcomes(&["Yes", "No"]);
        let result = run(&set, &[no(dec!(0.8)), yes(dec!(0.7)), yes(dec!(0.9)), no(dec!(0.8))]);
        let winner = result.winner.unwrap();
        assert_eq!(winner.outcome, "Yes");
        assert_eq!(winner.index, 0);

        let set = outcomes(&["No", "Yes"]);
        let result = run(&set, &[no(dec!(0.8)), yes(dec!(0.7)), yes(dec!(0.9)), no(dec!(0.8))]);
        assert_eq!(result.winner.unwrap().outcome, "No");
    }

    #[test]
    fn later_outcome_wins_only_when_strictly_better() {
        let set = outcomes(&["A", "B", "C"]);
        let result = run(
            &set,
            &[
                Judgment::labelled("C", dec!(0.9)),
                Judgment::labelled("A", dec!(0.8)),
                Judgment::labelled("B", dec!(0.9)),
            ],
        );
        assert_eq!(result.winner.unwrap().outcome, "B");
        assert_eq!(result.ranking, vec![1, 2, 0]);
    }

    #[test]
    fn order_does_not_change_statistics() {
        let set = outcomes(&["Yes", "No", "Maybe"]);
        let judgments = vec![
            yes(dec!(0.91)),
            no(dec!(0.62)),
            Judgment::labelled("Maybe", dec!(0.77)),
            yes(dec!(0.66)),
            no(dec!(0.99)),
            no(dec!(0.4)),
            yes(dec!(0.73)),
        ];
        let forward = run(&set, &judgments);

        let mut reversed = judgments.clone();
        reversed.reverse();
        let backward = run(&set, &reversed);

        assert_eq!(forward.winner, backward.winner);
        assert_eq!(forward.total_analyzed, backward.total_analyzed);
        for (f, b) in forward.summaries.iter().zip(&backward.summaries) {
            assert_eq!(f.count, b.count);
            assert_eq!(f.confidence_sum, b.confidence_sum);
            assert_eq!(f.support_percentage, b.support_percentage);
            assert_eq!(f.avg_confidence, b.avg_confidence);
        }
    }

    #[test]
    fn percentages_sum_to_about_one_hundred() {
        let set = outcomes(&["A", "B", "C"]);
        let result = run(
            &set,
            &[
                Judgment::labelled("A", dec!(0.9)),
                Judgment::labelled("B", dec!(0.9)),
                Judgment::labelled("C", dec!(0.9)),
            ],
        );

        let total: Decimal = result.summaries.iter().map(|s| s.support_percentage).sum();
        assert_eq!(result.summaries[0].support_percentage, dec!(33.33));
        assert!((total - dec!(100)).abs() <= dec!(0.1));
    }

    #[test]
    fn dominance_at_ninety_five_percent() {
        let set = outcomes(&["Yes", "No"]);
        let mut judgments = vec![yes(dec!(0.9)); 19];
        judgments.push(no(dec!(0.9)));
        let result = run(&set, &judgments);
        assert!(result.dominant);
        assert_eq!(result.winner_share(), dec!(0.95));

        let mut judgments = vec![yes(dec!(0.9)); 18];
        judgments.push(no(dec!(0.9)));
        judgments.push(no(dec!(0.9)));
        assert!(!run(&set, &judgments).dominant);

        assert!(run(&set, &[yes(dec!(0.7))]).dominant);
    }

    #[test]
    fn supporters_capped_and_sorted() {
        let set = outcomes(&["Yes", "No"]);
        // 150 accepted judgments with confidences 0.600 .. 0.749
        let judgments: Vec<Judgment> = (0..150)
            .map(|i| yes(dec!(0.6) + Decimal::new(i, 3)))
            .collect();
        let result = run(&set, &judgments);

        let summary = result.summary("Yes").unwrap();
        assert_eq!(summary.count, 150);
        assert_eq!(summary.supporters.len(), 100);
        assert_eq!(summary.supporters[0].confidence, dec!(0.749));
        assert_eq!(summary.supporters[99].confidence, dec!(0.650));
        assert!(summary
            .supporters
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(summary.supporters[0].tweet_id, "149");
        assert_eq!(summary.supporters[0].author, "user149");
    }

    #[test]
    fn missing_author_reported_as_unknown() {
        let set = outcomes(&["Yes", "No"]);
        let anonymous = ReplyItem::new("x", "yes!");
        let judgment = yes(dec!(0.9));
        let result = accumulate(&set, [(&anonymous, &judgment)], &AggregatorConfig::default());
        assert_eq!(result.summary("Yes").unwrap().supporters[0].author, "unknown");
    }

    #[test]
    fn custom_threshold_applies() {
        let set = outcomes(&["Yes", "No"]);
        let config = AggregatorConfig {
            min_confidence: dec!(0.8),
            ..AggregatorConfig::default()
        };
        let items: Vec<ReplyItem> = (0..2).map(item).collect();
        let judgments = [yes(dec!(0.75)), no(dec!(0.85))];
        let result = accumulate(&set, items.iter().zip(&judgments), &config);
        assert_eq!(result.winner.unwrap().outcome, "No");
        assert_eq!(result.unclassified_count, 1);
    }
}
