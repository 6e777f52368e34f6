//! Scheduling domain - availability rules and slot derivation.
//!
//! Pure functions only: rules expand into candidate slots, and candidates
//! are filtered against merged exclusion intervals. Fetching busy windows
//! and reservations is the application layer's job.

mod rule;
mod slots;

pub use rule::{AvailabilityRule, Recurrence, MAX_BUFFER_MINUTES, MAX_SLOT_MINUTES, MIN_SLOT_MINUTES};
pub use slots::{exclude_overlapping, expand_rules, first_overlap, merge_windows, Slot};
