//! Direct stage mapping
//!
//! Each staged sample accumulates into its own bucket. In-bed samples have no
//! bucket under this policy.

use crate::types::{Bucket, PolicyKind, SleepStage};

use super::AggregationPolicy;

/// One stage, one bucket
pub struct DirectMapping;

const BUCKETS: &[Bucket] = &[
    Bucket::Awake,
    Bucket::Rem,
    Bucket::Core,
    Bucket::Deep,
    Bucket::Asleep,
];

impl AggregationPolicy for DirectMapping {
    fn kind(&self) -> PolicyKind {
        PolicyKind::DirectMapping
    }

    fn buckets(&self) -> &'static [Bucket] {
        BUCKETS
    }

    fn route(&self, stage: SleepStage) -> Option<Bucket> {
        match stage {
            SleepStage::Awake => Some(Bucket::Awake),
            SleepStage::Rem => Some(Bucket::Rem),
            SleepStage::Core => Some(Bucket::Core),
            SleepStage::Deep => Some(Bucket::Deep),
            SleepStage::AsleepUnspecified => Some(Bucket::Asleep),
            SleepStage::InBed => None,
        }
    }

    fn label(&self, bucket: Bucket) -> Option<&'static str> {
        match bucket {
            Bucket::Awake => Some("Acordado"),
            Bucket::Rem => Some("REM"),
            Bucket::Core => Some("Essencial"),
            Bucket::Deep => Some("Profundo"),
            Bucket::Asleep => Some("Tempo Dormindo"),
            Bucket::InBed => None,
        }
    }
}
