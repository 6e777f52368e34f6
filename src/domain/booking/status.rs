//! Reservation status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle of a reservation.
///
/// ```text
/// Pending --[event created]--> Confirmed --[cancel]--> Cancelled
/// Pending --[event failed / caller gone]--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Slot claimed locally; external event not yet created.
    Pending,

    /// External event exists and its reference is recorded.
    Confirmed,

    /// External confirmation could not be completed. Frees the slot.
    Failed,

    /// Cancelled after confirmation. Frees the slot.
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if a reservation in this status holds its window,
    /// i.e. participates in the per-owner overlap guard.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Failed => "failed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "failed" => Ok(ReservationStatus::Failed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown reservation status '{}'", other),
            )),
        }
    }
}

impl StateMachine for ReservationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed) | (Pending, Failed) | (Confirmed, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ReservationStatus::*;
        match self {
            Pending => vec![Confirmed, Failed],
            Confirmed => vec![Cancelled],
            Failed => vec![],
            Cancelled => vec![],
        }
    }
}
