//! Sample record schema
//!
//! This module defines the serialized input form of sleep samples, as exported
//! from a device health store, and the adapter that decodes it into typed
//! [`crate::types::SleepSample`]s.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
