//! Reservation aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OwnerId, ReservationId, StateMachine, TimeWindow, ValidationError};

use super::ReservationStatus;

/// Who is booking the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Requester {
    /// Creates a validated requester.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, ValidationError> {
        let requester = Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            notes: None,
        };
        requester.validate()?;
        Ok(requester)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("requester.name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::empty_field("requester.email"));
        }
        let at = self.email.find('@');
        if !matches!(at, Some(i) if i > 0 && i + 1 < self.email.len()) {
            return Err(ValidationError::invalid_format(
                "requester.email",
                "expected local@domain",
            ));
        }
        Ok(())
    }
}

/// Pointer to the event mirrored into the external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEventRef {
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default)]
    pub conference_link: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// Durable record of a slot claimed by a requester.
///
/// Invariant: `external_event` is `Some` exactly when the reservation is
/// (or was, before cancellation) `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub owner_id: OwnerId,
    pub window: TimeWindow,
    pub requester: Requester,
    pub status: ReservationStatus,
    pub external_event: Option<ExternalEventRef>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a new reservation in `Pending`.
    pub fn pending(owner_id: OwnerId, window: TimeWindow, requester: Requester, now: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            owner_id,
            window,
            requester,
            status: ReservationStatus::Pending,
            external_event: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the external event and moves to `Confirmed`.
    pub fn confirm(&mut self, event: ExternalEventRef, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ReservationStatus::Confirmed)?;
        self.external_event = Some(event);
        self.updated_at = now;
        Ok(())
    }

    /// Moves to `Failed`, releasing the window.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ReservationStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// Moves a confirmed reservation to `Cancelled`, releasing the window.
    /// The external event reference is kept so cleanup can find it.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ReservationStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    /// True if this reservation blocks `other` from being booked for the same owner.
    pub fn blocks(&self, owner_id: &OwnerId, window: &TimeWindow) -> bool {
        self.occupies_slot() && &self.owner_id == owner_id && self.window.overlaps(window)
    }
}
