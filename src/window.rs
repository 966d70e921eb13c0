//! Aggregation window generation
//!
//! Windows step backwards one day at a time from "now" over a fixed lookback
//! count. Calendar days are resolved in a fixed UTC offset.

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;
use crate::types::AggregationWindow;

/// Default number of days looked back
pub const DEFAULT_LOOKBACK_DAYS: u32 = 5;

/// Upper bound accepted for the lookback count
pub const MAX_LOOKBACK_DAYS: u32 = 366;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Where each window starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStartRule {
    /// Local midnight of each day
    #[default]
    StartOfDay,
    /// `now` minus whole days, without snapping to midnight.
    ///
    /// Window `k` is `[now - k days, now - k days + 1 day)`. Window 0 starts
    /// at `now` and lies entirely in the future; it is empty for any real
    /// export.
    Rolling,
}

/// Window generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub lookback_days: u32,
    pub window_start: WindowStartRule,
    /// Local offset from UTC used to resolve calendar days
    pub utc_offset_minutes: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            window_start: WindowStartRule::StartOfDay,
            utc_offset_minutes: 0,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), SummaryError> {
        if self.lookback_days == 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(SummaryError::InvalidConfig(format!(
                "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        self.offset().map(|_| ())
    }

    pub fn offset(&self) -> Result<FixedOffset, SummaryError> {
        if self.utc_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(SummaryError::InvalidTimezone(format!(
                "{} minutes",
                self.utc_offset_minutes
            )));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            SummaryError::InvalidTimezone(format!("{} minutes", self.utc_offset_minutes))
        })
    }

    /// Generate the lookback windows, newest first
    pub fn windows(&self, now: DateTime<Utc>) -> Result<Vec<AggregationWindow>, SummaryError> {
        self.validate()?;
        let offset = self.offset()?;

        (0..self.lookback_days)
            .map(|days_back| match self.window_start {
                WindowStartRule::StartOfDay => start_of_day_window(now, offset, days_back),
                WindowStartRule::Rolling => rolling_window(now, offset, days_back),
            })
            .collect()
    }
}

fn start_of_day_window(
    now: DateTime<Utc>,
    offset: FixedOffset,
    days_back: u32,
) -> Result<AggregationWindow, SummaryError> {
    let today = now.with_timezone(&offset).date_naive();
    let date = today
        .checked_sub_days(Days::new(u64::from(days_back)))
        .ok_or_else(|| SummaryError::InvalidWindow(format!("{days_back} days before {today}")))?;

    let start = offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| SummaryError::InvalidWindow(format!("midnight of {date}")))?
        .with_timezone(&Utc);

    Ok(AggregationWindow {
        date,
        start,
        end: start + TimeDelta::days(1),
    })
}

fn rolling_window(
    now: DateTime<Utc>,
    offset: FixedOffset,
    days_back: u32,
) -> Result<AggregationWindow, SummaryError> {
    let start = now
        .checked_sub_signed(TimeDelta::days(i64::from(days_back)))
        .ok_or_else(|| SummaryError::InvalidWindow(format!("{days_back} days before {now}")))?;

    Ok(AggregationWindow {
        date: start.with_timezone(&offset).date_naive(),
        start,
        end: start + TimeDelta::days(1),
    })
}
