//! Calendar Gateway Port - busy windows and events in the external calendar.
//!
//! Implementations authenticate through a `CredentialProvider`, bound every
//! call with the `RequestContext`, and on an authentication rejection
//! invalidate the credential and retry exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::TimeWindow;

use super::request_context::{Interrupted, RequestContext};
use super::token_source::CredentialError;

/// An attendee invited to a created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub display_name: Option<String>,
}

/// Event to create in the external calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInput {
    pub summary: String,
    pub description: Option<String>,
    pub window: TimeWindow,
    pub attendees: Vec<Attendee>,
    /// Ask the calendar to attach a video-conference link.
    pub request_conference: bool,
    /// Stable key so a retried create does not produce two events.
    pub request_id: String,
}

/// The external calendar's view of a created event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub event_id: String,
    pub html_link: Option<String>,
    pub conference_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request was malformed before it left the process.
    #[error("invalid gateway request: {0}")]
    InvalidInput(String),

    /// Authentication still failed after one invalidate-and-retry.
    #[error("calendar rejected credentials: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Network failure, timeout or 5xx.
    #[error("calendar unavailable: {0}")]
    Unavailable(String),

    /// A 4xx the caller cannot fix by retrying.
    #[error("calendar rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response did not have the expected shape.
    #[error("unexpected calendar response: {0}")]
    Parse(String),

    #[error("calendar call cancelled")]
    Cancelled,
}

impl From<Interrupted> for GatewayError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => GatewayError::Cancelled,
            Interrupted::TimedOut(after) => {
                GatewayError::Unavailable(format!("timed out after {:?}", after))
            }
        }
    }
}

#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Busy intervals on `calendar_id` intersecting `[from, to)`.
    ///
    /// `from >= to` fails with `InvalidInput` without a network call.
    async fn list_busy_windows(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeWindow>, GatewayError>;

    async fn create_event(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        input: &EventInput,
    ) -> Result<CreatedEvent, GatewayError>;

    /// Removes an event. An event that is already gone counts as deleted.
    async fn delete_event(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), GatewayError>;
}
