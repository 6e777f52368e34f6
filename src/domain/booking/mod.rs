//! Booking domain - reservations and their lifecycle.

mod errors;
mod reservation;
mod status;

pub use errors::BookingError;
pub use reservation::{ExternalEventRef, Requester, Reservation};
pub use status::ReservationStatus;
