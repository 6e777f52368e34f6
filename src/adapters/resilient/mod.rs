//! Resilient store selector.
//!
//! Decorators that put an in-memory fallback behind a persistent store.
//! The decision is made per call: an error meaning "the store is absent or
//! misconfigured" (see `DomainError::is_store_absent`) re-runs the call on
//! the fallback; every other error propagates unchanged. Each entity gets
//! its own `FallbackPolicy`.

mod policy;
mod reservations;
mod rules;

pub use policy::FallbackPolicy;
pub use reservations::ResilientReservationRepository;
pub use rules::ResilientRuleRepository;
