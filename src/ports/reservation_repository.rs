//! Reservation storage.
//!
//! `insert_pending` is the atomic guard against double booking: it must
//! reject a reservation whose window overlaps an active (pending or
//! confirmed) reservation for the same owner, even when two inserts race.

use async_trait::async_trait;

use crate::domain::booking::Reservation;
use crate::domain::foundation::{DomainError, OwnerId, ReservationId, TimeWindow};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Stores a new pending reservation.
    ///
    /// # Errors
    ///
    /// - `Conflict` if an active reservation for the owner overlaps the window
    /// - `Duplicate` if the id already exists
    async fn insert_pending(&self, reservation: &Reservation) -> Result<(), DomainError>;

    /// Persists a status change. `RecordNotFound` if the id is unknown.
    async fn update(&self, reservation: &Reservation) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError>;

    /// Pending and confirmed reservations for the owner overlapping `range`.
    async fn find_active_in_range(
        &self,
        owner_id: &OwnerId,
        range: &TimeWindow,
    ) -> Result<Vec<Reservation>, DomainError>;
}
