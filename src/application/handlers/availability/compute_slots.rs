//! ComputeSlotsHandler - Query handler for an owner's bookable slots.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::handlers::settings::SchedulingSettings;
use crate::application::handlers::support::{availability_error, bounded_store, gather_exclusions};
use crate::domain::booking::BookingError;
use crate::domain::foundation::{OwnerId, TimeWindow};
use crate::domain::scheduling::{exclude_overlapping, expand_rules, Slot};
use crate::ports::{AvailabilityRuleRepository, CalendarGateway, Clock, RequestContext, ReservationRepository};

/// Query for the free slots of one owner within `[from, to)`.
#[derive(Debug, Clone)]
pub struct ComputeSlotsQuery {
    pub owner_id: OwnerId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeSlotsResult {
    /// Ordered by start ascending.
    pub slots: Vec<Slot>,
}

/// Handler for computing availability.
///
/// The result is recomputed on every call; a second call may differ.
pub struct ComputeSlotsHandler {
    rules: Arc<dyn AvailabilityRuleRepository>,
    reservations: Arc<dyn ReservationRepository>,
    gateway: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    settings: Arc<SchedulingSettings>,
}

impl ComputeSlotsHandler {
    pub fn new(
        rules: Arc<dyn AvailabilityRuleRepository>,
        reservations: Arc<dyn ReservationRepository>,
        gateway: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
        settings: Arc<SchedulingSettings>,
    ) -> Self {
        Self {
            rules,
            reservations,
            gateway,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        query: ComputeSlotsQuery,
    ) -> Result<ComputeSlotsResult, BookingError> {
        // 1. Validate the range
        let range = TimeWindow::new(query.from, query.to)
            .map_err(|e| BookingError::invalid_input("range", e.to_string()))?;
        if range.duration() > self.settings.max_range() {
            return Err(BookingError::invalid_input(
                "range",
                format!("longer than {} days", self.settings.max_range_days),
            ));
        }

        // 2. Load rules
        let rules = bounded_store(
            ctx,
            self.settings.store_timeout,
            "find_rules_by_owner",
            self.rules.find_by_owner(&query.owner_id),
        )
        .await?;
        if rules.is_empty() {
            tracing::debug!(owner_id = %query.owner_id, "Owner has no availability rules");
            return Ok(ComputeSlotsResult { slots: Vec::new() });
        }

        // 3. Expand candidates, honoring minimum notice
        let earliest = self.clock.now() + self.settings.min_notice;
        let candidates: Vec<Slot> = expand_rules(&rules, &range)
            .into_iter()
            .filter(|slot| slot.window().start() >= earliest)
            .collect();
        let Some(hull) = footprint_hull(&candidates) else {
            return Ok(ComputeSlotsResult { slots: Vec::new() });
        };

        // 4. Subtract busy windows and held reservations
        let excluded = gather_exclusions(
            ctx,
            self.gateway.as_ref(),
            self.reservations.as_ref(),
            self.settings.calendar_for(&query.owner_id),
            self.settings.store_timeout,
            &query.owner_id,
            &hull,
            availability_error,
        )
        .await?;
        let slots = exclude_overlapping(candidates, &excluded);

        tracing::debug!(
            owner_id = %query.owner_id,
            rules = rules.len(),
            excluded = excluded.len(),
            slots = slots.len(),
            "Computed availability"
        );
        Ok(ComputeSlotsResult { slots })
    }
}

/// Smallest window covering every candidate footprint. Buffers may reach
/// past the query range, so conflicts are fetched over this instead.
fn footprint_hull(candidates: &[Slot]) -> Option<TimeWindow> {
    let start = candidates.iter().map(|s| s.footprint().start()).min()?;
    let end = candidates.iter().map(|s| s.footprint().end()).max()?;
    TimeWindow::new(start, end).ok()
}
