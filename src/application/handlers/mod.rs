//! Application handlers.
//!
//! Query and command handlers that orchestrate the scheduling domain
//! through the ports. Every store call is bounded by the request context
//! and `SchedulingSettings::store_timeout`.

pub mod availability;
pub mod booking;
mod settings;
mod support;

pub use availability::{ComputeSlotsHandler, ComputeSlotsQuery, ComputeSlotsResult};
pub use booking::{
    CancelReservationCommand, CancelReservationHandler, CancelReservationResult,
    GetReservationHandler, GetReservationQuery, ReserveSlotCommand, ReserveSlotHandler,
    ReserveSlotResult,
};
pub use settings::SchedulingSettings;
