//! ReserveSlotHandler - Command handler for booking a slot.
//!
//! # Flow
//!
//! 1. Re-validate the slot against rules, busy windows and held reservations
//! 2. Insert a `Pending` reservation; the store's overlap guard is authoritative
//! 3. Create the external event and move to `Confirmed`
//!
//! Step 3 runs in its own task. If the caller goes away after step 2 the task
//! is cancelled, and it still records `Failed` so no `Pending` row is orphaned.
//! An insert cut short by a timeout or cancellation is released the same way,
//! since the store may have committed it anyway.

use std::sync::Arc;
use std::time::Duration;

use crate::application::handlers::settings::SchedulingSettings;
use crate::application::handlers::support::{bounded_store, gateway_error, gather_exclusions};
use crate::domain::booking::{BookingError, ExternalEventRef, Requester, Reservation, ReservationStatus};
use crate::domain::foundation::{ErrorCode, OwnerId, ReservationId, TimeWindow};
use crate::domain::scheduling::{expand_rules, first_overlap};
use crate::ports::{
    Attendee, AvailabilityRuleRepository, CalendarGateway, Clock, EventInput, GatewayError,
    RequestContext, ReservationRepository,
};

/// Command to reserve one slot for a requester.
#[derive(Debug, Clone)]
pub struct ReserveSlotCommand {
    pub owner_id: OwnerId,
    pub requester: Requester,
    pub slot: TimeWindow,
}

#[derive(Debug, Clone)]
pub struct ReserveSlotResult {
    /// Always `Confirmed`.
    pub reservation: Reservation,
}

/// Handler for reserving slots.
pub struct ReserveSlotHandler {
    rules: Arc<dyn AvailabilityRuleRepository>,
    reservations: Arc<dyn ReservationRepository>,
    gateway: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    settings: Arc<SchedulingSettings>,
}

impl ReserveSlotHandler {
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
        cmd: ReserveSlotCommand,
    ) -> Result<ReserveSlotResult, BookingError> {
        cmd.requester.validate()?;

        // 1. Re-validate at commit time
        let rules = bounded_store(
            ctx,
            self.settings.store_timeout,
            "find_rules_by_owner",
            self.rules.find_by_owner(&cmd.owner_id),
        )
        .await?;
        let slot = expand_rules(&rules, &cmd.slot)
            .into_iter()
            .find(|candidate| candidate.window() == cmd.slot)
            .ok_or_else(|| {
                BookingError::invalid_input("slot", "does not match a slot offered by the owner's rules")
            })?;
        if slot.window().start() < self.clock.now() + self.settings.min_notice {
            return Err(BookingError::invalid_input("slot", "starts within the minimum notice period"));
        }

        let calendar_id = self.settings.calendar_for(&cmd.owner_id).to_string();
        let excluded = gather_exclusions(
            ctx,
            self.gateway.as_ref(),
            self.reservations.as_ref(),
            &calendar_id,
            self.settings.store_timeout,
            &cmd.owner_id,
            &slot.footprint(),
            gateway_error,
        )
        .await?;
        if let Some(conflict) = first_overlap(&excluded, &slot.footprint()) {
            return Err(BookingError::slot_unavailable(
                cmd.slot,
                format!("overlaps busy time {}", conflict),
            ));
        }

        // 2. Claim the slot
        let reservation = Reservation::pending(cmd.owner_id.clone(), cmd.slot, cmd.requester, self.clock.now());
        let release = Release {
            reservations: self.reservations.clone(),
            clock: self.clock.clone(),
            store_timeout: self.settings.store_timeout,
        };
        match bounded_store(
            ctx,
            self.settings.store_timeout,
            "insert_pending",
            self.reservations.insert_pending(&reservation),
        )
        .await
        {
            Ok(()) => {}
            Err(BookingError::Storage(e)) if e.is_write_conflict() => {
                tracing::info!(
                    owner_id = %cmd.owner_id,
                    window = %cmd.slot,
                    "Slot claimed concurrently"
                );
                return Err(BookingError::slot_unavailable(cmd.slot, e.message));
            }
            Err(e) if insert_outcome_unknown(&e) => {
                // The store may still commit the row after we stop waiting.
                tracing::warn!(
                    reservation_id = %reservation.id,
                    owner_id = %cmd.owner_id,
                    error = %e,
                    "Insert interrupted, releasing any row it left behind"
                );
                release.mark_failed(reservation, &e.to_string()).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        // 3. Confirm in the external calendar
        let confirmation = Confirmation {
            reservations: self.reservations.clone(),
            gateway: self.gateway.clone(),
            settings: self.settings.clone(),
            clock: self.clock.clone(),
            release: release.clone(),
            calendar_id,
        };
        let child = ctx.child();
        let guard = child.cancellation_token().clone().drop_guard();
        let reservation_id = reservation.id;
        let outcome = tokio::spawn(confirmation.run(child, reservation)).await;
        guard.disarm();

        match outcome {
            Ok(result) => result.map(|reservation| ReserveSlotResult { reservation }),
            Err(join_err) => {
                tracing::error!(
                    reservation_id = %reservation_id,
                    error = %join_err,
                    "Confirmation task did not complete"
                );
                let reason = format!("confirmation task aborted: {}", join_err);
                release.mark_failed_if_pending(reservation_id, &reason).await;
                Err(BookingError::confirmation_failed(reservation_id, reason))
            }
        }
    }
}

/// True when an interrupted insert may still have been committed.
fn insert_outcome_unknown(err: &BookingError) -> bool {
    match err {
        BookingError::Cancelled(_) => true,
        BookingError::Storage(e) => e.code == ErrorCode::Timeout,
        _ => false,
    }
}

/// Records `Failed` on a detached context so the slot is released even
/// when the caller is gone.
#[derive(Clone)]
struct Release {
    reservations: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl Release {
    async fn mark_failed(&self, mut reservation: Reservation, reason: &str) {
        if let Err(e) = reservation.fail(reason, self.clock.now()) {
            tracing::error!(reservation_id = %reservation.id, error = %e, "Cannot mark reservation failed");
            return;
        }
        match bounded_store(
            &RequestContext::new(),
            self.store_timeout,
            "update_reservation",
            self.reservations.update(&reservation),
        )
        .await
        {
            Ok(()) => {}
            Err(BookingError::Storage(e)) if e.code == ErrorCode::RecordNotFound => {
                tracing::debug!(reservation_id = %reservation.id, "No row to release");
            }
            Err(e) => tracing::error!(
                reservation_id = %reservation.id,
                error = %e,
                "Could not record failed reservation; slot stays held until repaired"
            ),
        }
    }

    /// Fails the stored reservation if it never left `Pending`.
    async fn mark_failed_if_pending(&self, id: ReservationId, reason: &str) {
        let stored = bounded_store(
            &RequestContext::new(),
            self.store_timeout,
            "find_reservation",
            self.reservations.find_by_id(&id),
        )
        .await;
        match stored {
            Ok(Some(reservation)) if reservation.status == ReservationStatus::Pending => {
                self.mark_failed(reservation, reason).await
            }
            Ok(_) => {}
            Err(e) => tracing::error!(
                reservation_id = %id,
                error = %e,
                "Could not load reservation to release it"
            ),
        }
    }
}

/// Everything the confirmation task needs, owned so it can outlive the caller.
struct Confirmation {
    reservations: Arc<dyn ReservationRepository>,
    gateway: Arc<dyn CalendarGateway>,
    settings: Arc<SchedulingSettings>,
    clock: Arc<dyn Clock>,
    release: Release,
    calendar_id: String,
}

impl Confirmation {
    async fn run(self, ctx: RequestContext, mut reservation: Reservation) -> Result<Reservation, BookingError> {
        let input = event_input(&reservation, self.settings.request_conference);
        let created = ctx
            .run(
                self.settings.confirmation_timeout,
                self.gateway.create_event(&ctx, &self.calendar_id, &input),
            )
            .await
            .map_err(GatewayError::from)
            .and_then(|result| result);

        let created = match created {
            Ok(created) => created,
            Err(e) => return Err(self.compensate(reservation, e.to_string()).await),
        };

        let pending = reservation.clone();
        let event = ExternalEventRef {
            calendar_id: self.calendar_id.clone(),
            event_id: created.event_id,
            conference_link: created.conference_link,
            html_link: created.html_link,
        };
        reservation.confirm(event.clone(), self.clock.now())?;

        // The caller may be gone; the outcome is recorded regardless.
        let detached = RequestContext::new();
        if let Err(e) = bounded_store(
            &detached,
            self.settings.store_timeout,
            "update_reservation",
            self.reservations.update(&reservation),
        )
        .await
        {
            if let Err(delete_err) = self
                .gateway
                .delete_event(&detached, &self.calendar_id, &event.event_id)
                .await
            {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    event_id = %event.event_id,
                    error = %delete_err,
                    "Could not remove event for unrecorded confirmation"
                );
            }
            return Err(self.compensate(pending, format!("recording confirmation failed: {}", e)).await);
        }

        tracing::info!(
            reservation_id = %reservation.id,
            owner_id = %reservation.owner_id,
            window = %reservation.window,
            event_id = %event.event_id,
            "Reservation confirmed"
        );
        Ok(reservation)
    }

    /// Moves the reservation to `Failed` so the slot is released.
    async fn compensate(&self, reservation: Reservation, reason: String) -> BookingError {
        tracing::error!(
            reservation_id = %reservation.id,
            owner_id = %reservation.owner_id,
            window = %reservation.window,
            reason = %reason,
            "Booking confirmation failed, releasing slot"
        );
        let id = reservation.id;
        self.release.mark_failed(reservation, &reason).await;
        BookingError::confirmation_failed(id, reason)
    }
}

fn event_input(reservation: &Reservation, request_conference: bool) -> EventInput {
    let requester = &reservation.requester;
    EventInput {
        summary: format!("Meeting with {}", requester.name),
        description: requester.notes.clone(),
        window: reservation.window,
        attendees: vec![Attendee {
            email: requester.email.clone(),
            display_name: Some(requester.name.clone()),
        }],
        request_conference,
        request_id: reservation.id.to_string(),
    }
}
