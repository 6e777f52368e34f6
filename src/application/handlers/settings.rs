//! Scheduling settings shared by the availability and booking handlers.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::foundation::OwnerId;

#[derive(Debug, Clone)]
pub struct SchedulingSettings {
    /// Longest range `ComputeSlots` accepts.
    pub max_range_days: u32,
    /// Slots starting sooner than this from now are not offered or bookable.
    pub min_notice: chrono::Duration,
    /// Bound on every repository call.
    pub store_timeout: Duration,
    /// Bound on creating the external event during `Reserve`.
    pub confirmation_timeout: Duration,
    /// Calendar used for owners without an explicit mapping.
    pub default_calendar_id: String,
    pub owner_calendars: HashMap<String, String>,
    /// Ask the calendar for a conference link on created events.
    pub request_conference: bool,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            max_range_days: 62,
            min_notice: chrono::Duration::zero(),
            store_timeout: Duration::from_secs(3),
            confirmation_timeout: Duration::from_secs(15),
            default_calendar_id: "primary".to_string(),
            owner_calendars: HashMap::new(),
            request_conference: true,
        }
    }
}

impl SchedulingSettings {
    /// The external calendar that mirrors `owner_id`'s bookings.
    pub fn calendar_for(&self, owner_id: &OwnerId) -> &str {
        self.owner_calendars
            .get(owner_id.as_str())
            .map(String::as_str)
            .unwrap_or(&self.default_calendar_id)
    }

    pub fn max_range(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_range_days))
    }
}
