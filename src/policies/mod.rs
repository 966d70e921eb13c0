//! Aggregation policies
//!
//! A policy decides which bucket each sleep stage accumulates into, which
//! buckets are post-computed from others, and how buckets are labelled for
//! display. Two strategies exist; both are selectable through [`PolicyKind`].

mod derived;
mod direct;

pub use derived::{DerivedRatio, ESTIMATED_DEEP_RATIO, ESTIMATED_REM_RATIO};
pub use direct::DirectMapping;

use crate::types::{Bucket, PolicyKind, SleepStage};
use std::collections::BTreeMap;

/// Trait for stage-to-bucket routing strategies
pub trait AggregationPolicy: Send + Sync {
    /// Kind tag recorded on every summary this policy produces
    fn kind(&self) -> PolicyKind;

    /// Every bucket present in this policy's summaries
    fn buckets(&self) -> &'static [Bucket];

    /// Bucket a sample of `stage` accumulates into, if any
    fn route(&self, stage: SleepStage) -> Option<Bucket>;

    /// Post-fold step over the measured totals (seconds)
    fn derive(&self, _buckets: &mut BTreeMap<Bucket, f64>) {}

    /// Display label for a bucket
    fn label(&self, bucket: Bucket) -> Option<&'static str>;

    /// Whether a bucket holds an estimate rather than a measured sum
    fn is_estimated(&self, _bucket: Bucket) -> bool {
        false
    }
}

impl PolicyKind {
    /// Resolve the strategy for this kind
    pub fn policy(&self) -> &'static dyn AggregationPolicy {
        match self {
            PolicyKind::DirectMapping => &DirectMapping,
            PolicyKind::DerivedRatio => &DerivedRatio,
        }
    }

    /// Labels of this policy, in bucket order
    pub fn labels(&self) -> Vec<&'static str> {
        let policy = self.policy();
        policy
            .buckets()
            .iter()
            .filter_map(|bucket| policy.label(*bucket))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_bucket_has_a_label() {
        for kind in [PolicyKind::DirectMapping, PolicyKind::DerivedRatio] {
            let policy = kind.policy();
            assert_eq!(policy.kind(), kind);
            for bucket in policy.buckets() {
                assert!(policy.label(*bucket).is_some(), "{kind}: {bucket:?}");
            }
        }
    }

    #[test]
    fn test_routes_land_in_declared_buckets() {
        for kind in [PolicyKind::DirectMapping, PolicyKind::DerivedRatio] {
            let policy = kind.policy();
            for stage in SleepStage::ALL {
                if let Some(bucket) = policy.route(stage) {
                    assert!(policy.buckets().contains(&bucket));
                }
            }
        }
    }

    #[test]
    fn test_label_vocabularies() {
        let mut direct = PolicyKind::DirectMapping.labels();
        direct.sort_unstable();
        assert_eq!(
            direct,
            vec!["Acordado", "Essencial", "Profundo", "REM", "Tempo Dormindo"]
        );

        let mut derived = PolicyKind::DerivedRatio.labels();
        derived.sort_unstable();
        assert_eq!(
            derived,
            vec![
                "Tempo Acordado",
                "Tempo Dormindo",
                "Tempo de Sono Profundo",
                "Tempo de Sono REM",
                "Tempo na Cama",
            ]
        );
    }
}
