//! Attendee counter reconciler
//!
//! Owns `Event::attendees_count`. Registration writes carry their counter
//! change into the store, which applies it atomically with the row; this
//! module defines that change, offers the raw adjustment, and rebuilds the
//! value from the confirmed registrations when asked.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;
use crate::database::{EntityStore, Recount};
use crate::models::{RegistrationStatus, RegistrationWrite};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::{log_counter_adjustment, log_counter_drift};

const RECOUNT_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct AttendeeCounter {
    store: Arc<dyn EntityStore>,
}

impl AttendeeCounter {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Counter change for a registration moving from `from` (`None` for a
    /// new row) to `to`
    pub fn delta(from: Option<RegistrationStatus>, to: RegistrationStatus) -> i32 {
        match from {
            Some(from) => from.attendee_delta(to),
            None => i32::from(to.counts_as_attendee()),
        }
    }

    /// Apply `delta` to the attendee counter, clamped at zero.
    /// Returns the new count, or `None` when `delta` is 0 or the event is gone.
    pub async fn reconcile(&self, event_id: Uuid, delta: i32) -> Result<Option<i32>> {
        if delta == 0 {
            return Ok(None);
        }

        let count = self.store.increment_attendees_count(event_id, delta).await?;
        if count.is_none() {
            tracing::warn!(event_id = %event_id, delta = delta, "Attendee counter update for missing event");
        }
        log_counter_adjustment(event_id, delta, count);
        Ok(count)
    }

    /// Record the counter change a registration write already applied
    pub fn record_transition(&self, from: Option<RegistrationStatus>, write: &RegistrationWrite) {
        let delta = Self::delta(from, write.registration.status);
        if delta != 0 {
            log_counter_adjustment(write.registration.event_id, delta, Some(write.attendees_count));
        }
    }

    /// Recount confirmed registrations and overwrite the stored counter
    pub async fn recompute_attendees_count(&self, event_id: Uuid) -> Result<Recount> {
        let recount = self
            .store
            .recount_attendees(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))?;

        if recount.drifted() {
            log_counter_drift(event_id, recount.previous, recount.recomputed);
        }
        Ok(recount)
    }

    /// Recount every event; returns the recounts that corrected drift
    pub async fn recompute_all(&self) -> Result<Vec<Recount>> {
        let event_ids = self.store.list_event_ids().await?;
        let total = event_ids.len();

        let results: Vec<Result<Recount>> = stream::iter(event_ids)
            .map(|event_id| async move { self.recompute_attendees_count(event_id).await })
            .buffer_unordered(RECOUNT_CONCURRENCY)
            .collect()
            .await;

        let mut repaired = Vec::new();
        for result in results {
            match result {
                Ok(recount) if recount.drifted() => repaired.push(recount),
                Ok(_) => {}
                // deleted between listing and recounting
                Err(EventHubError::NotFound { .. }) => {}
                Err(e) => tracing::error!(error = %e, "Attendee recount failed"),
            }
        }

        tracing::info!(events = total, repaired = repaired.len(), "Attendee counter sweep completed");
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{Event, EventStatus, PaymentStatus, Registration};
    use chrono::{Duration, Utc};

    async fn seed_event(store: &MemoryStore) -> Event {
        let now = Utc::now();
        store
            .insert_event(Event {
                id: Uuid::new_v4(),
                organizer_id: Uuid::new_v4(),
                title: "Collegiate Shag Social".to_string(),
                capacity: 0,
                is_published: true,
                is_paid: false,
                price_cents: 0,
                start_date: now + Duration::days(2),
                end_date: now + Duration::days(2),
                status: EventStatus::Active,
                attendees_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    async fn seed_registration(store: &MemoryStore, event_id: Uuid, status: RegistrationStatus) {
        let now = Utc::now();
        store
            .insert_registration(
                Registration {
                    id: Uuid::new_v4(),
                    event_id,
                    user_id: Uuid::new_v4(),
                    status,
                    payment_status: PaymentStatus::NotApplicable,
                    attendance_status: false,
                    registration_date: now,
                    ticket_type: "general".to_string(),
                    notes: None,
                    updated_at: now,
                },
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_zero_delta_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let event = seed_event(&store).await;
        let counter = AttendeeCounter::new(store.clone());

        assert_eq!(counter.reconcile(event.id, 0).await.unwrap(), None);
        assert_eq!(counter.reconcile(event.id, 1).await.unwrap(), Some(1));
        assert_eq!(counter.reconcile(event.id, -5).await.unwrap(), Some(0));
    }

    #[test]
    fn test_delta_for_new_and_existing_rows() {
        use RegistrationStatus::*;
        assert_eq!(AttendeeCounter::delta(None, Confirmed), 1);
        assert_eq!(AttendeeCounter::delta(None, Pending), 0);
        assert_eq!(AttendeeCounter::delta(Some(Confirmed), Cancelled), -1);
        assert_eq!(AttendeeCounter::delta(Some(Cancelled), Pending), 0);
    }

    #[tokio::test]
    async fn test_recompute_heals_drifted_counter() {
        let store = Arc::new(MemoryStore::new());
        let event = seed_event(&store).await;
        seed_registration(&store, event.id, RegistrationStatus::Confirmed).await;
        seed_registration(&store, event.id, RegistrationStatus::Confirmed).await;
        seed_registration(&store, event.id, RegistrationStatus::Pending).await;
        seed_registration(&store, event.id, RegistrationStatus::Cancelled).await;
        // a stray adjustment outside any registration write
        store.increment_attendees_count(event.id, 3).await.unwrap();

        let counter = AttendeeCounter::new(store.clone());
        let recount = counter.recompute_attendees_count(event.id).await.unwrap();
        assert_eq!(recount, Recount { event_id: event.id, previous: 5, recomputed: 2 });

        // idempotent
        let again = counter.recompute_attendees_count(event.id).await.unwrap();
        assert!(!again.drifted());
        assert_eq!(store.find_event(event.id).await.unwrap().unwrap().attendees_count, 2);
    }

    #[tokio::test]
    async fn test_recompute_all_reports_only_drift() {
        let store = Arc::new(MemoryStore::new());
        let clean = seed_event(&store).await;
        let drifted = seed_event(&store).await;
        seed_registration(&store, drifted.id, RegistrationStatus::Confirmed).await;
        store.increment_attendees_count(drifted.id, -1).await.unwrap();

        let counter = AttendeeCounter::new(store.clone());
        let repaired = counter.recompute_all().await.unwrap();
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].event_id, drifted.id);
        assert_eq!(store.find_event(clean.id).await.unwrap().unwrap().attendees_count, 0);
    }

    #[tokio::test]
    async fn test_recompute_missing_event() {
        let counter = AttendeeCounter::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            counter.recompute_attendees_count(Uuid::new_v4()).await,
            Err(EventHubError::NotFound { .. })
        ));
    }
}
