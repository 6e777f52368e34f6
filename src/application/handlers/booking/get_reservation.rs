//! GetReservationHandler - Query handler for a single reservation.

use std::sync::Arc;

use crate::application::handlers::settings::SchedulingSettings;
use crate::application::handlers::support::bounded_store;
use crate::domain::booking::{BookingError, Reservation};
use crate::domain::foundation::ReservationId;
use crate::ports::{RequestContext, ReservationRepository};

#[derive(Debug, Clone)]
pub struct GetReservationQuery {
    pub reservation_id: ReservationId,
}

pub struct GetReservationHandler {
    reservations: Arc<dyn ReservationRepository>,
    settings: Arc<SchedulingSettings>,
}

impl GetReservationHandler {
    pub fn new(reservations: Arc<dyn ReservationRepository>, settings: Arc<SchedulingSettings>) -> Self {
        Self {
            reservations,
            settings,
        }
    }

    pub async fn handle(&self, ctx: &RequestContext, query: GetReservationQuery) -> Result<Reservation, BookingError> {
        bounded_store(
            ctx,
            self.settings.store_timeout,
            "find_reservation",
            self.reservations.find_by_id(&query.reservation_id),
        )
        .await?
        .ok_or(BookingError::NotFound(query.reservation_id))
    }
}
