//! Derived-ratio policy
//!
//! Only in-bed, asleep and awake time are measured. Deep and REM time are
//! **estimates**: fixed fractions of total asleep time, and both buckets are
//! flagged as estimated.

use crate::types::{Bucket, PolicyKind, SleepStage};
use std::collections::BTreeMap;

use super::AggregationPolicy;

/// Fraction of asleep time reported as deep sleep (heuristic)
pub const ESTIMATED_DEEP_RATIO: f64 = 0.15;

/// Fraction of asleep time reported as REM sleep (heuristic)
pub const ESTIMATED_REM_RATIO: f64 = 0.20;

/// Measured in-bed/asleep/awake plus ratio-estimated deep and REM
pub struct DerivedRatio;

const BUCKETS: &[Bucket] = &[
    Bucket::InBed,
    Bucket::Asleep,
    Bucket::Awake,
    Bucket::Deep,
    Bucket::Rem,
];

impl AggregationPolicy for DerivedRatio {
    fn kind(&self) -> PolicyKind {
        PolicyKind::DerivedRatio
    }

    fn buckets(&self) -> &'static [Bucket] {
        BUCKETS
    }

    fn route(&self, stage: SleepStage) -> Option<Bucket> {
        match stage {
            SleepStage::InBed => Some(Bucket::InBed),
            SleepStage::Awake => Some(Bucket::Awake),
            // Staged sleep counts as asleep
            SleepStage::AsleepUnspecified
            | SleepStage::Core
            | SleepStage::Deep
            | SleepStage::Rem => Some(Bucket::Asleep),
        }
    }

    fn derive(&self, buckets: &mut BTreeMap<Bucket, f64>) {
        let asleep = buckets.get(&Bucket::Asleep).copied().unwrap_or(0.0);
        buckets.insert(Bucket::Deep, asleep * ESTIMATED_DEEP_RATIO);
        buckets.insert(Bucket::Rem, asleep * ESTIMATED_REM_RATIO);
    }

    fn label(&self, bucket: Bucket) -> Option<&'static str> {
        match bucket {
            Bucket::InBed => Some("Tempo na Cama"),
            Bucket::Asleep => Some("Tempo Dormindo"),
            Bucket::Awake => Some("Tempo Acordado"),
            Bucket::Deep => Some("Tempo de Sono Profundo"),
            Bucket::Rem => Some("Tempo de Sono REM"),
            Bucket::Core => None,
        }
    }

    fn is_estimated(&self, bucket: Bucket) -> bool {
        matches!(bucket, Bucket::Deep | Bucket::Rem)
    }
}
