//! PostgreSQL implementation of ReservationRepository.
//!
//! Overlap protection is the `reservations_no_overlap` exclusion
//! constraint; a violation surfaces as `ErrorCode::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::booking::{ExternalEventRef, Requester, Reservation, ReservationStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, OwnerId, ReservationId, TimeWindow,
};
use crate::ports::ReservationRepository;

use super::errors::{column, map_sqlx_error};

const SELECT_COLUMNS: &str = r#"
    SELECT id, owner_id, start_at, end_at, requester_name, requester_email,
           requester_notes, status, calendar_id, event_id, conference_link,
           html_link, failure_reason, created_at, updated_at
    FROM reservations
"#;

#[derive(Clone)]
pub struct PostgresReservationRepository {
    pool: PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    async fn insert_pending(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let event = reservation.external_event.as_ref();

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, owner_id, start_at, end_at, requester_name, requester_email,
                requester_notes, status, calendar_id, event_id, conference_link,
                html_link, failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.owner_id.as_str())
        .bind(reservation.window.start())
        .bind(reservation.window.end())
        .bind(&reservation.requester.name)
        .bind(&reservation.requester.email)
        .bind(&reservation.requester.notes)
        .bind(reservation.status.as_str())
        .bind(event.map(|e| e.calendar_id.as_str()))
        .bind(event.map(|e| e.event_id.as_str()))
        .bind(event.and_then(|e| e.conference_link.as_deref()))
        .bind(event.and_then(|e| e.html_link.as_deref()))
        .bind(&reservation.failure_reason)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert reservation", e))?;

        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let event = reservation.external_event.as_ref();

        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                status = $2,
                calendar_id = $3,
                event_id = $4,
                conference_link = $5,
                html_link = $6,
                failure_reason = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.status.as_str())
        .bind(event.map(|e| e.calendar_id.as_str()))
        .bind(event.map(|e| e.event_id.as_str()))
        .bind(event.and_then(|e| e.conference_link.as_deref()))
        .bind(event.and_then(|e| e.html_link.as_deref()))
        .bind(&reservation.failure_reason)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update reservation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("reservation", reservation.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to fetch reservation", e))?;

        row.as_ref().map(row_to_reservation).transpose()
    }

    async fn find_active_in_range(
        &self,
        owner_id: &OwnerId,
        range: &TimeWindow,
    ) -> Result<Vec<Reservation>, DomainError> {
        let sql = format!(
            "{} WHERE owner_id = $1 AND status IN ('pending', 'confirmed') \
             AND start_at < $3 AND end_at > $2 ORDER BY start_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id.as_str())
            .bind(range.start())
            .bind(range.end())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to fetch active reservations", e))?;

        rows.iter().map(row_to_reservation).collect()
    }
}

fn row_to_reservation(row: &PgRow) -> Result<Reservation, DomainError> {
    let id: uuid::Uuid = column(row, "id")?;
    let owner_id: String = column(row, "owner_id")?;
    let start_at: DateTime<Utc> = column(row, "start_at")?;
    let end_at: DateTime<Utc> = column(row, "end_at")?;
    let status: String = column(row, "status")?;
    let calendar_id: Option<String> = column(row, "calendar_id")?;
    let event_id: Option<String> = column(row, "event_id")?;

    let status: ReservationStatus = status.parse().map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Stored reservation status: {}", e))
    })?;

    let external_event = match (calendar_id, event_id) {
        (Some(calendar_id), Some(event_id)) => Some(ExternalEventRef {
            calendar_id,
            event_id,
            conference_link: column(row, "conference_link")?,
            html_link: column(row, "html_link")?,
        }),
        _ => None,
    };

    Ok(Reservation {
        id: ReservationId::from_uuid(id),
        owner_id: OwnerId::new(owner_id)?,
        window: TimeWindow::new(start_at, end_at)?,
        requester: Requester {
            name: column(row, "requester_name")?,
            email: column(row, "requester_email")?,
            notes: column(row, "requester_notes")?,
        },
        status,
        external_event,
        failure_reason: column(row, "failure_reason")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}
