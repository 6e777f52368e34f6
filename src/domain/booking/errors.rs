//! Booking error taxonomy.
//!
//! # Audience
//!
//! | Error | Audience |
//! |-------|----------|
//! | InvalidInput | client (fix the request) |
//! | SlotUnavailable | client (pick another slot) |
//! | NotFound | client |
//! | InvalidState | client |
//! | BookingConfirmationFailed | client, distinct: a local record exists |
//! | CredentialUnavailable | operator |
//! | GatewayUnavailable | operator |
//! | AvailabilityUnavailable | operator |
//! | Storage | operator |
//! | Cancelled | caller went away |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ReservationId, TimeWindow, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Malformed range, slot or requester.
    #[error("invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// No credential strategy produced a token.
    #[error("calendar credentials unavailable: {0}")]
    CredentialUnavailable(String),

    /// The calendar API could not complete a call.
    #[error("calendar gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Slots cannot be computed without risking a false positive.
    #[error("availability cannot be computed safely: {0}")]
    AvailabilityUnavailable(String),

    /// The slot is taken, either found at pre-check or rejected by the store guard.
    #[error("slot {window} is no longer available: {reason}")]
    SlotUnavailable { window: TimeWindow, reason: String },

    /// The local reservation exists but the external event could not be created.
    #[error("reservation {reservation_id} could not be confirmed: {reason}")]
    BookingConfirmationFailed {
        reservation_id: ReservationId,
        reason: String,
    },

    #[error("reservation not found: {0}")]
    NotFound(ReservationId),

    #[error("reservation is {current}, cannot {attempted}")]
    InvalidState { current: String, attempted: String },

    /// The caller cancelled or its deadline elapsed.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// A store error that is not a slot conflict.
    #[error("storage failure: {0}")]
    Storage(DomainError),
}

impl BookingError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        BookingError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn slot_unavailable(window: TimeWindow, reason: impl Into<String>) -> Self {
        BookingError::SlotUnavailable {
            window,
            reason: reason.into(),
        }
    }

    pub fn confirmation_failed(reservation_id: ReservationId, reason: impl Into<String>) -> Self {
        BookingError::BookingConfirmationFailed {
            reservation_id,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidInput { .. } => "INVALID_INPUT",
            BookingError::CredentialUnavailable(_) => "CREDENTIAL_UNAVAILABLE",
            BookingError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            BookingError::AvailabilityUnavailable(_) => "AVAILABILITY_UNAVAILABLE",
            BookingError::SlotUnavailable { .. } => "SLOT_UNAVAILABLE",
            BookingError::BookingConfirmationFailed { .. } => "BOOKING_CONFIRMATION_FAILED",
            BookingError::NotFound(_) => "RESERVATION_NOT_FOUND",
            BookingError::InvalidState { .. } => "INVALID_STATE_TRANSITION",
            BookingError::Cancelled(_) => "CANCELLED",
            BookingError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// The client can fix this by changing its request.
    pub fn is_client_correctable(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidInput { .. }
                | BookingError::SlotUnavailable { .. }
                | BookingError::NotFound(_)
                | BookingError::InvalidState { .. }
        )
    }

    /// An outage an operator must look at.
    pub fn is_outage(&self) -> bool {
        matches!(
            self,
            BookingError::CredentialUnavailable(_)
                | BookingError::GatewayUnavailable(_)
                | BookingError::AvailabilityUnavailable(_)
                | BookingError::Storage(_)
        )
    }
}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        match &err {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => {
                BookingError::invalid_input(field.clone(), err.to_string())
            }
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(err: DomainError) -> Self {
        BookingError::Storage(err)
    }
}
