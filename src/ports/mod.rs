//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Credentials
//!
//! - `TokenStrategy` - One way of producing a bearer token
//! - `CredentialProvider` - What the calendar gateway authenticates with
//! - `RefreshTokenStore` - Durable storage for rotated refresh tokens
//!
//! ## Calendar
//!
//! - `CalendarGateway` - Busy windows and event creation/deletion
//!
//! ## Storage
//!
//! - `AvailabilityRuleRepository` / `RuleAdministration` - Availability rules
//! - `ReservationRepository` - Reservations with an atomic overlap guard
//!
//! ## Cross-cutting
//!
//! - `RequestContext` - Cancellation and deadline carried through every call
//! - `Clock` - Source of "now"

mod availability_rule_repository;
mod calendar_gateway;
mod clock;
mod refresh_token_store;
mod request_context;
mod reservation_repository;
mod token_source;

pub use availability_rule_repository::{AvailabilityRuleRepository, RuleAdministration};
pub use calendar_gateway::{Attendee, CalendarGateway, CreatedEvent, EventInput, GatewayError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use refresh_token_store::{RefreshTokenStore, RefreshTokenStoreError};
pub use request_context::{Interrupted, RequestContext};
pub use reservation_repository::ReservationRepository;
pub use token_source::{Credential, CredentialError, CredentialProvider, TokenStrategy};
