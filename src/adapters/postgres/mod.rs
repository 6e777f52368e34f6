//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresRuleRepository` - Availability rules, with administration
//! - `PostgresReservationRepository` - Reservations guarded by an exclusion constraint
//!
//! Every sqlx error passes through `map_sqlx_error`, which decides whether
//! the resilient selector may fall back.

mod errors;
mod reservation_repository;
mod rule_repository;

pub use errors::{classify_sqlstate, map_sqlx_error};
pub use reservation_repository::PostgresReservationRepository;
pub use rule_repository::PostgresRuleRepository;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::StoreMisconfigured, format!("Migration failed: {}", e)))
}
