//! Slotwise - meeting booking core
//!
//! Computes an owner's bookable slots from recurring availability rules,
//! external calendar busy windows and local reservations, and books a slot
//! atomically while mirroring it into the owner's calendar.
//!
//! - `domain` - time windows, rules, slot algebra, the reservation state machine
//! - `ports` - async traits at every external seam
//! - `adapters` - credential chain, calendar gateway, memory/Postgres/resilient stores
//! - `application` - query and command handlers
//! - `bootstrap` - explicit wiring from `config`

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
