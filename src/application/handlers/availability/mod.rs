//! Availability handlers.

mod compute_slots;

pub use compute_slots::{ComputeSlotsHandler, ComputeSlotsQuery, ComputeSlotsResult};
