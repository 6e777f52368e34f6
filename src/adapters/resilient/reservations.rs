//! Resilient reservation repository.
//!
//! Reservations written during an outage live only in the fallback. While
//! degrading is allowed, reads therefore merge both stores and new inserts
//! are checked against the fallback's active reservations before they reach
//! the primary.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::adapters::memory::InMemoryReservationRepository;
use crate::domain::booking::Reservation;
use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, ReservationId, TimeWindow};
use crate::ports::ReservationRepository;

use super::policy::{log_fallback, FallbackPolicy};

pub struct ResilientReservationRepository<P, F = InMemoryReservationRepository> {
    primary: P,
    fallback: F,
    policy: FallbackPolicy,
}

impl<P, F> ResilientReservationRepository<P, F>
where
    P: ReservationRepository,
    F: ReservationRepository,
{
    pub fn new(primary: P, fallback: F, policy: FallbackPolicy) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

#[async_trait]
impl<P, F> ReservationRepository for ResilientReservationRepository<P, F>
where
    P: ReservationRepository,
    F: ReservationRepository,
{
    async fn insert_pending(&self, reservation: &Reservation) -> Result<(), DomainError> {
        if self.policy.degrades() {
            let held = self
                .fallback
                .find_active_in_range(&reservation.owner_id, &reservation.window)
                .await?;
            if let Some(existing) = held.first() {
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!(
                        "window {} overlaps reservation {} held in fallback store",
                        reservation.window, existing.id
                    ),
                ));
            }
        }

        match self.primary.insert_pending(reservation).await {
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("reservation", "insert_pending", &e);
                self.fallback.insert_pending(reservation).await
            }
            other => other,
        }
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), DomainError> {
        match self.primary.update(reservation).await {
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("reservation", "update", &e);
                self.fallback.update(reservation).await
            }
            other => other,
        }
    }

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
        match self.primary.find_by_id(id).await {
            Ok(Some(found)) => Ok(Some(found)),
            Ok(None) if self.policy.degrades() => self.fallback.find_by_id(id).await,
            Ok(None) => Ok(None),
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("reservation", "find_by_id", &e);
                self.fallback.find_by_id(id).await
            }
            Err(e) => Err(e),
        }
    }

    async fn find_active_in_range(
        &self,
        owner_id: &OwnerId,
        range: &TimeWindow,
    ) -> Result<Vec<Reservation>, DomainError> {
        let mut active = match self.primary.find_active_in_range(owner_id, range).await {
            Ok(found) => found,
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("reservation", "find_active_in_range", &e);
                return self.fallback.find_active_in_range(owner_id, range).await;
            }
            Err(e) => return Err(e),
        };

        if self.policy.degrades() {
            let seen: HashSet<ReservationId> = active.iter().map(|r| r.id).collect();
            let held = self.fallback.find_active_in_range(owner_id, range).await?;
            active.extend(held.into_iter().filter(|r| !seen.contains(&r.id)));
            active.sort_by_key(|r| r.window);
        }
        Ok(active)
    }
}
