//! Sleep-sample aggregation
//!
//! Folds one window's samples into a [`DailySummary`]. The fold is pure and
//! order-independent: totals are accumulated in whole milliseconds and only
//! converted to seconds once every sample has been folded.

use crate::policies::AggregationPolicy;
use crate::types::{Bucket, DailySummary, PolicyKind, SampleStats, SleepSample};
use std::collections::BTreeMap;

/// Aggregation engine
pub struct Aggregator;

impl Aggregator {
    /// Aggregate a window's samples under `policy`.
    ///
    /// Every bucket of the policy is present in the result, at zero when no
    /// sample contributed. Inverted samples contribute nothing and are counted
    /// in [`SampleStats::negative_duration`].
    pub fn aggregate(policy: &dyn AggregationPolicy, samples: &[SleepSample]) -> DailySummary {
        let mut totals_ms: BTreeMap<Bucket, i64> =
            policy.buckets().iter().map(|bucket| (*bucket, 0)).collect();
        let mut stats = SampleStats::default();

        for sample in samples {
            if sample.is_inverted() {
                stats.negative_duration += 1;
                continue;
            }

            match policy.route(sample.stage) {
                Some(bucket) => {
                    let total = totals_ms.entry(bucket).or_insert(0);
                    *total = total.saturating_add(sample.duration().num_milliseconds());
                    stats.folded += 1;
                }
                None => stats.unmapped_stage += 1,
            }
        }

        let mut buckets: BTreeMap<Bucket, f64> = totals_ms
            .into_iter()
            .map(|(bucket, ms)| (bucket, ms as f64 / 1000.0))
            .collect();
        policy.derive(&mut buckets);

        DailySummary {
            policy: policy.kind(),
            buckets,
            stats,
        }
    }
}

/// Aggregate samples with the strategy selected by `kind`
pub fn aggregate(kind: PolicyKind, samples: &[SleepSample]) -> DailySummary {
    Aggregator::aggregate(kind.policy(), samples)
}
