//! Scheduling limits and timeouts

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    /// Longest range a single availability query may span
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,

    /// Slots starting sooner than this are neither offered nor bookable
    #[serde(default)]
    pub min_notice_minutes: u32,

    /// Bound on each repository call, in milliseconds
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Bound on creating the calendar event during a reservation
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_ms: u64,
}

impl SchedulingConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn min_notice(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.min_notice_minutes))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=366).contains(&self.max_range_days) {
            return Err(ValidationError::OutOfRange {
                field: "scheduling.max_range_days",
                min: 1,
                max: 366,
            });
        }
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("scheduling.store_timeout_ms"));
        }
        if self.confirmation_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("scheduling.confirmation_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_range_days: default_max_range_days(),
            min_notice_minutes: 0,
            store_timeout_ms: default_store_timeout(),
            confirmation_timeout_ms: default_confirmation_timeout(),
        }
    }
}

fn default_max_range_days() -> u32 {
    62
}

fn default_store_timeout() -> u64 {
    3_000
}

fn default_confirmation_timeout() -> u64 {
    15_000
}
