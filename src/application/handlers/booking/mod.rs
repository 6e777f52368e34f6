//! Booking handlers - reserve, cancel and read reservations.

mod cancel_reservation;
mod get_reservation;
mod reserve_slot;

pub use cancel_reservation::{CancelReservationCommand, CancelReservationHandler, CancelReservationResult};
pub use get_reservation::{GetReservationHandler, GetReservationQuery};
pub use reserve_slot::{ReserveSlotCommand, ReserveSlotHandler, ReserveSlotResult};
