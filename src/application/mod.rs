//! Application layer - Commands, Queries, and Handlers.
//!
//! Queries (`ComputeSlots`, `GetReservation`) read through the ports;
//! commands (`ReserveSlot`, `CancelReservation`) drive the reservation
//! state machine.

pub mod handlers;

pub use handlers::{
    // Availability
    ComputeSlotsHandler, ComputeSlotsQuery, ComputeSlotsResult,
    // Booking
    CancelReservationCommand, CancelReservationHandler, CancelReservationResult,
    GetReservationHandler, GetReservationQuery, ReserveSlotCommand, ReserveSlotHandler,
    ReserveSlotResult,
    // Settings
    SchedulingSettings,
};
