//! PostgreSQL implementation of the availability rule ports.

use async_trait::async_trait;
use chrono::NaiveTime;
use chrono_tz::Tz;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, RuleId};
use crate::domain::scheduling::{AvailabilityRule, Recurrence};
use crate::ports::{AvailabilityRuleRepository, RuleAdministration};

use super::errors::{column, map_sqlx_error};

#[derive(Clone)]
pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRuleRepository for PostgresRuleRepository {
    async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<AvailabilityRule>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, recurrence, open_from, open_until, timezone,
                   slot_minutes, buffer_before_minutes, buffer_after_minutes
            FROM availability_rules
            WHERE owner_id = $1
            ORDER BY open_from, id
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch availability rules", e))?;

        rows.iter().map(row_to_rule).collect()
    }
}

#[async_trait]
impl RuleAdministration for PostgresRuleRepository {
    async fn upsert(&self, rule: &AvailabilityRule) -> Result<(), DomainError> {
        rule.validate()?;

        sqlx::query(
            r#"
            INSERT INTO availability_rules (
                id, owner_id, recurrence, open_from, open_until, timezone,
                slot_minutes, buffer_before_minutes, buffer_after_minutes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                recurrence = EXCLUDED.recurrence,
                open_from = EXCLUDED.open_from,
                open_until = EXCLUDED.open_until,
                timezone = EXCLUDED.timezone,
                slot_minutes = EXCLUDED.slot_minutes,
                buffer_before_minutes = EXCLUDED.buffer_before_minutes,
                buffer_after_minutes = EXCLUDED.buffer_after_minutes,
                updated_at = now()
            "#,
        )
        .bind(rule.id.as_uuid())
        .bind(rule.owner_id.as_str())
        .bind(Json(&rule.recurrence))
        .bind(rule.open_from)
        .bind(rule.open_until)
        .bind(rule.timezone.name())
        .bind(rule.slot_minutes as i32)
        .bind(rule.buffer_before_minutes as i32)
        .bind(rule.buffer_after_minutes as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to upsert availability rule", e))?;

        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM availability_rules WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete availability rule", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("availability rule", id));
        }
        Ok(())
    }
}

fn minutes(row: &PgRow, name: &str) -> Result<u32, DomainError> {
    let value: i32 = column(row, name)?;
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Negative {} in stored rule: {}", name, value),
        )
    })
}

fn row_to_rule(row: &PgRow) -> Result<AvailabilityRule, DomainError> {
    let id: uuid::Uuid = column(row, "id")?;
    let owner_id: String = column(row, "owner_id")?;
    let recurrence: Json<Recurrence> = column(row, "recurrence")?;
    let open_from: NaiveTime = column(row, "open_from")?;
    let open_until: NaiveTime = column(row, "open_until")?;
    let timezone: String = column(row, "timezone")?;

    let timezone: Tz = timezone.parse().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Unknown time zone {}: {}", timezone, e),
        )
    })?;

    Ok(AvailabilityRule {
        id: RuleId::from_uuid(id),
        owner_id: OwnerId::new(owner_id)?,
        recurrence: recurrence.0,
        open_from,
        open_until,
        timezone,
        slot_minutes: minutes(row, "slot_minutes")?,
        buffer_before_minutes: minutes(row, "buffer_before_minutes")?,
        buffer_after_minutes: minutes(row, "buffer_after_minutes")?,
    })
}
