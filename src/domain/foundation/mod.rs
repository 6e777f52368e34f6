//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the time window type, and error
//! types that form the vocabulary of the booking domain.

mod errors;
mod ids;
mod state_machine;
mod time_window;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OwnerId, ReservationId, RuleId};
pub use state_machine::StateMachine;
pub use time_window::TimeWindow;
