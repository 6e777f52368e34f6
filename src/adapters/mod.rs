//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `credentials` - Token strategies, the strategy chain, refresh token stores
//! - `calendar` - Google Calendar gateway and a mock for tests
//! - `memory` - In-memory stores and their seed data
//! - `postgres` - PostgreSQL stores
//! - `resilient` - Per-call fallback from a persistent store to memory

pub mod calendar;
pub mod credentials;
pub mod memory;
pub mod postgres;
pub mod resilient;
