//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, time windows, errors, state machine)
//! - `scheduling` - Availability rules and slot algebra
//! - `booking` - Reservations, their lifecycle and the booking error taxonomy

pub mod booking;
pub mod foundation;
pub mod scheduling;
