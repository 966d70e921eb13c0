//! Summary configuration
//!
//! All settings have defaults, so a partial JSON file is enough. Command-line
//! flags are applied on top of a loaded file.

use serde::{Deserialize, Serialize};

use crate::error::SummaryError;
use crate::types::PolicyKind;
use crate::window::{WindowConfig, WindowStartRule, DEFAULT_LOOKBACK_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Stage routing strategy
    pub policy: PolicyKind,
    /// Number of days looked back, today included
    pub lookback_days: u32,
    /// Window start rule
    pub window_start: WindowStartRule,
    /// Local offset from UTC used to resolve calendar days
    pub utc_offset_minutes: i32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            window_start: WindowStartRule::default(),
            utc_offset_minutes: 0,
        }
    }
}

impl SummaryConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, SummaryError> {
        let config: SummaryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, SummaryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            lookback_days: self.lookback_days,
            window_start: self.window_start,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }

    pub fn validate(&self) -> Result<(), SummaryError> {
        self.window().validate()
    }
}
