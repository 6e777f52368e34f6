//! Calendar API configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::adapters::calendar::GOOGLE_CALENDAR_API_BASE;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Base URL of the calendar REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Calendar used for owners without an entry in `owner_calendars`
    #[serde(default = "default_calendar_id")]
    pub default_calendar_id: String,

    /// Owner id -> calendar id
    #[serde(default)]
    pub owner_calendars: HashMap<String, String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Ask for a video-conference link on created events
    #[serde(default = "default_true")]
    pub request_conference: bool,

    /// Let the calendar email attendees about created/deleted events
    #[serde(default = "default_true")]
    pub notify_attendees: bool,
}

impl CalendarConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("calendar.api_base_url"));
        }
        if self.default_calendar_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("calendar.default_calendar_id"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("calendar.request_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_calendar_id: default_calendar_id(),
            owner_calendars: HashMap::new(),
            request_timeout_secs: default_request_timeout(),
            request_conference: true,
            notify_attendees: true,
        }
    }
}

fn default_api_base_url() -> String {
    GOOGLE_CALENDAR_API_BASE.to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_defaults_are_valid() {
        let config = CalendarConfig::default();
        assert_eq!(config.default_calendar_id, "primary");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = CalendarConfig {
            api_base_url: "ftp://calendar".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUrl("calendar.api_base_url")));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = CalendarConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
