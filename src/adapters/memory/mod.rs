//! In-memory stores.
//!
//! Used directly when no database is configured, and as the canonical
//! fallback behind the resilient selector. Populated from `SeedData` at
//! startup and injected explicitly; there is no process-wide instance.

mod reservation_repository;
mod rule_repository;
mod seed;

pub use reservation_repository::InMemoryReservationRepository;
pub use rule_repository::InMemoryRuleRepository;
pub use seed::{SeedData, SeedError};
