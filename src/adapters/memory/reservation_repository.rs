//! In-memory reservation store.
//!
//! The overlap check and the insert happen under one write lock, giving
//! the same guarantee inside the process that the Postgres exclusion
//! constraint gives across processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::booking::Reservation;
use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, ReservationId, TimeWindow};
use crate::ports::ReservationRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationRepository {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored reservation, in creation order.
    pub async fn all(&self) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self.reservations.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        all
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert_pending(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let mut reservations = self.reservations.write().await;

        if reservations.contains_key(&reservation.id) {
            return Err(DomainError::new(
                ErrorCode::Duplicate,
                format!("reservation {} already exists", reservation.id),
            ));
        }

        if let Some(existing) = reservations
            .values()
            .find(|r| r.blocks(&reservation.owner_id, &reservation.window))
        {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("window {} overlaps reservation {}", reservation.window, existing.id),
            )
            .with_detail("conflicting_reservation", existing.id.to_string()));
        }

        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let mut reservations = self.reservations.write().await;
        match reservations.get_mut(&reservation.id) {
            Some(stored) => {
                *stored = reservation.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("reservation", reservation.id)),
        }
    }

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
        Ok(self.reservations.read().await.get(id).cloned())
    }

    async fn find_active_in_range(
        &self,
        owner_id: &OwnerId,
        range: &TimeWindow,
    ) -> Result<Vec<Reservation>, DomainError> {
        let reservations = self.reservations.read().await;
        let mut active: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.blocks(owner_id, range))
            .cloned()
            .collect();
        active.sort_by_key(|r| r.window);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::{Requester, ReservationStatus};
    use chrono::{TimeZone, Utc};

    fn window(start_min: u32, end_min: u32) -> TimeWindow {
        let base = Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap();
        TimeWindow::new(
            base + chrono::Duration::minutes(i64::from(start_min)),
            base + chrono::Duration::minutes(i64::from(end_min)),
        )
        .unwrap()
    }

    fn pending(owner: &str, w: TimeWindow) -> Reservation {
        Reservation::pending(
            OwnerId::new(owner).unwrap(),
            w,
            Requester::new("Ada", "ada@example.com").unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn overlapping_insert_is_a_conflict() {
        let repo = InMemoryReservationRepository::new();
        repo.insert_pending(&pending("alice", window(0, 30))).await.unwrap();

        let err = repo
            .insert_pending(&pending("alice", window(15, 45)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn adjacent_and_other_owner_inserts_succeed() {
        let repo = InMemoryReservationRepository::new();
        repo.insert_pending(&pending("alice", window(0, 30))).await.unwrap();
        repo.insert_pending(&pending("alice", window(30, 60))).await.unwrap();
        repo.insert_pending(&pending("bob", window(0, 30))).await.unwrap();
        assert_eq!(repo.all().await.len(), 3);
    }

    #[tokio::test]
    async fn failed_reservation_frees_the_window() {
        let repo = InMemoryReservationRepository::new();
        let mut first = pending("alice", window(0, 30));
        repo.insert_pending(&first).await.unwrap();
        first.fail("calendar down", Utc::now()).unwrap();
        repo.update(&first).await.unwrap();

        repo.insert_pending(&pending("alice", window(0, 30))).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let repo = InMemoryReservationRepository::new();
        let r = pending("alice", window(0, 30));
        repo.insert_pending(&r).await.unwrap();
        let err = repo.insert_pending(&r).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);
    }

    #[tokio::test]
    async fn concurrent_inserts_admit_exactly_one() {
        let repo = InMemoryReservationRepository::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert_pending(&pending("alice", window(0, 30))).await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn active_range_query_skips_failed_and_other_owners() {
        let repo = InMemoryReservationRepository::new();
        let mut failed = pending("alice", window(0, 30));
        repo.insert_pending(&failed).await.unwrap();
        failed.fail("x", Utc::now()).unwrap();
        repo.update(&failed).await.unwrap();
        let live = pending("alice", window(60, 90));
        repo.insert_pending(&live).await.unwrap();
        repo.insert_pending(&pending("bob", window(60, 90))).await.unwrap();

        let active = repo
            .find_active_in_range(&OwnerId::new("alice").unwrap(), &window(0, 120))
            .await
            .unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.id);
        assert_eq!(active[0].status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn updating_unknown_reservation_is_not_found() {
        let repo = InMemoryReservationRepository::new();
        let err = repo.update(&pending("alice", window(0, 30))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RecordNotFound);
    }
}
