//! CancelReservationHandler - Command handler for cancelling a confirmed reservation.

use std::sync::Arc;

use crate::application::handlers::settings::SchedulingSettings;
use crate::application::handlers::support::bounded_store;
use crate::domain::booking::{BookingError, Reservation};
use crate::domain::foundation::ReservationId;
use crate::ports::{CalendarGateway, Clock, RequestContext, ReservationRepository};

#[derive(Debug, Clone)]
pub struct CancelReservationCommand {
    pub reservation_id: ReservationId,
}

#[derive(Debug, Clone)]
pub struct CancelReservationResult {
    pub reservation: Reservation,
    /// False when the external event could not be removed.
    pub external_event_removed: bool,
}

/// Handler for cancelling reservations.
///
/// The local transition is authoritative: once `Cancelled` is stored the
/// slot is free, whatever happens to the external event.
pub struct CancelReservationHandler {
    reservations: Arc<dyn ReservationRepository>,
    gateway: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    settings: Arc<SchedulingSettings>,
}

impl CancelReservationHandler {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        gateway: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
        settings: Arc<SchedulingSettings>,
    ) -> Self {
        Self {
            reservations,
            gateway,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: CancelReservationCommand,
    ) -> Result<CancelReservationResult, BookingError> {
        let mut reservation = bounded_store(
            ctx,
            self.settings.store_timeout,
            "find_reservation",
            self.reservations.find_by_id(&cmd.reservation_id),
        )
        .await?
        .ok_or(BookingError::NotFound(cmd.reservation_id))?;

        let current = reservation.status;
        reservation.cancel(self.clock.now()).map_err(|_| BookingError::InvalidState {
            current: current.to_string(),
            attempted: "cancel".to_string(),
        })?;

        bounded_store(
            ctx,
            self.settings.store_timeout,
            "update_reservation",
            self.reservations.update(&reservation),
        )
        .await?;

        let external_event_removed = match &reservation.external_event {
            Some(event) => match self
                .gateway
                .delete_event(ctx, &event.calendar_id, &event.event_id)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        event_id = %event.event_id,
                        error = %e,
                        "Could not delete external event for cancelled reservation"
                    );
                    false
                }
            },
            None => true,
        };

        tracing::info!(
            reservation_id = %reservation.id,
            owner_id = %reservation.owner_id,
            external_event_removed,
            "Reservation cancelled"
        );
        Ok(CancelReservationResult {
            reservation,
            external_event_removed,
        })
    }
}
