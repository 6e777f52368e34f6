//! Maps sqlx errors onto domain error codes.
//!
//! The resilient selector depends on this classification: only codes for
//! an absent or misconfigured store trigger the in-memory fallback.

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Classifies a Postgres SQLSTATE.
pub fn classify_sqlstate(code: &str) -> ErrorCode {
    match code {
        // undefined_table, invalid_schema_name, undefined_column
        "42P01" | "3F000" | "42703" => ErrorCode::SchemaMissing,
        // insufficient_privilege, invalid_authorization_specification, invalid_password
        "42501" | "28000" | "28P01" => ErrorCode::AccessDenied,
        // invalid_catalog_name (database does not exist)
        "3D000" => ErrorCode::StoreMisconfigured,
        // cannot_connect_now, admin_shutdown
        "57P03" | "57P01" => ErrorCode::StoreUnreachable,
        // connection_exception class
        state if state.starts_with("08") => ErrorCode::StoreUnreachable,
        "23505" => ErrorCode::Duplicate,
        "23P01" => ErrorCode::Conflict,
        // query_canceled
        "57014" => ErrorCode::Timeout,
        _ => ErrorCode::DatabaseError,
    }
}

/// Converts a sqlx error into a `DomainError`, keeping the SQLSTATE as a detail.
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let sqlstate = db_err.code().map(|c| c.into_owned());
            let code = sqlstate
                .as_deref()
                .map(classify_sqlstate)
                .unwrap_or(ErrorCode::DatabaseError);
            let mapped = DomainError::new(code, format!("{}: {}", context, db_err.message()));
            match sqlstate {
                Some(state) => mapped.with_detail("sqlstate", state),
                None => mapped,
            }
        }
        sqlx::Error::Configuration(_) => {
            DomainError::new(ErrorCode::StoreMisconfigured, format!("{}: {}", context, err))
        }
        // No connection could be made or kept.
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => {
            DomainError::new(ErrorCode::StoreUnreachable, format!("{}: {}", context, err))
        }
        sqlx::Error::RowNotFound => {
            DomainError::new(ErrorCode::RecordNotFound, format!("{}: {}", context, err))
        }
        _ => DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err)),
    }
}

/// Reads one column, mapping decode failures to `DatabaseError`.
pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", name, e),
        )
    })
}
