//! Capacity guard
//!
//! Decides whether an event can take one more registration. The decision is
//! advisory for the caller; the store re-applies the same ceiling atomically
//! when the registration row is written.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use crate::database::EntityStore;
use crate::models::{CapacityLimit, Event, EventStatus, OccupancyRule};
use crate::utils::clock::Clock;
use crate::utils::errors::{EventHubError, Result};

/// Snapshot of an event's occupancy at decision time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityCheck {
    pub event_id: Uuid,
    pub allowed: bool,
    pub occupied: i64,
    /// 0 means unlimited
    pub capacity: i32,
}

impl CapacityCheck {
    /// Free slots, `None` when unlimited
    pub fn remaining(&self) -> Option<i64> {
        (self.capacity > 0).then(|| (i64::from(self.capacity) - self.occupied).max(0))
    }

    pub fn into_error(self) -> EventHubError {
        EventHubError::Capacity {
            event_id: self.event_id,
            capacity: self.capacity,
            occupied: self.occupied,
        }
    }
}

#[derive(Clone)]
pub struct CapacityGuard {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl CapacityGuard {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Check whether `event_id` has room for one more self-service registration
    pub async fn check_capacity(&self, event_id: Uuid) -> Result<CapacityCheck> {
        let event = self.load_open_event(event_id).await?;
        self.evaluate(&event, OccupancyRule::ReservePending).await
    }

    /// Load an event and make sure it currently accepts registrations
    pub async fn load_open_event(&self, event_id: Uuid) -> Result<Event> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))?;

        self.ensure_open(&event)?;
        Ok(event)
    }

    pub fn ensure_open(&self, event: &Event) -> Result<()> {
        if !event.is_published {
            return Err(EventHubError::InvalidState("cannot register for unpublished event".to_string()));
        }
        if event.status != EventStatus::Active {
            return Err(EventHubError::InvalidState(format!("event is {}", event.status)));
        }
        if event.has_started(self.clock.now()) {
            return Err(EventHubError::InvalidState("event already occurred".to_string()));
        }
        Ok(())
    }

    /// Count occupied slots under `rule` and compare against the ceiling
    pub async fn evaluate(&self, event: &Event, rule: OccupancyRule) -> Result<CapacityCheck> {
        let occupied = self.store.count_registrations(event.id, rule.statuses()).await?;
        let allowed = match Self::limit(event, rule) {
            Some(limit) => limit.admits(occupied),
            None => true,
        };

        tracing::debug!(
            event_id = %event.id,
            capacity = event.capacity,
            occupied = occupied,
            allowed = allowed,
            "Capacity evaluated"
        );

        Ok(CapacityCheck {
            event_id: event.id,
            allowed,
            occupied,
            capacity: event.capacity,
        })
    }

    /// Ceiling the store must enforce on insert; `None` for unlimited events
    pub fn limit(event: &Event, rule: OccupancyRule) -> Option<CapacityLimit> {
        CapacityLimit::for_capacity(event.capacity, rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{PaymentStatus, Registration, RegistrationStatus};
    use crate::utils::clock::FixedClock;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    fn event(capacity: i32) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Shag Workshop".to_string(),
            capacity,
            is_published: true,
            is_paid: false,
            price_cents: 0,
            start_date: now + Duration::days(10),
            end_date: now + Duration::days(10) + Duration::hours(3),
            status: EventStatus::Active,
            attendees_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(event_id: Uuid, status: RegistrationStatus) -> Registration {
        let now = Utc::now();
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
        }
    }

    fn guard(store: Arc<MemoryStore>) -> CapacityGuard {
        CapacityGuard::new(store, Arc::new(FixedClock::new(Utc::now())))
    }

    #[tokio::test]
    async fn test_unlimited_event_always_allows() {
        let store = Arc::new(MemoryStore::new());
        let event = store.insert_event(event(0)).await.unwrap();
        for _ in 0..3 {
            store
                .insert_registration(registration(event.id, RegistrationStatus::Confirmed), None)
                .await
                .unwrap();
        }

        let check = guard(store).check_capacity(event.id).await.unwrap();
        assert!(check.allowed);
        assert_eq!(check.occupied, 3);
        assert_eq!(check.remaining(), None);
    }

    #[tokio::test]
    async fn test_pending_reserves_a_slot() {
        let store = Arc::new(MemoryStore::new());
        let event = store.insert_event(event(2)).await.unwrap();
        for status in [RegistrationStatus::Pending, RegistrationStatus::Confirmed, RegistrationStatus::Cancelled] {
            store.insert_registration(registration(event.id, status), None).await.unwrap();
        }

        let check = guard(store).check_capacity(event.id).await.unwrap();
        assert!(!check.allowed);
        assert_eq!(check.occupied, 2);
        assert_eq!(check.remaining(), Some(0));
    }

    #[tokio::test]
    async fn test_rejects_closed_events() {
        let store = Arc::new(MemoryStore::new());
        let guard = guard(store.clone());

        assert_matches!(
            guard.check_capacity(Uuid::new_v4()).await,
            Err(EventHubError::NotFound { .. })
        );

        let mut draft = event(5);
        draft.is_published = false;
        let draft = store.insert_event(draft).await.unwrap();
        assert_matches!(
            guard.check_capacity(draft.id).await,
            Err(EventHubError::InvalidState(msg)) if msg.contains("unpublished")
        );

        let mut past = event(5);
        past.start_date = Utc::now() - Duration::hours(1);
        let past = store.insert_event(past).await.unwrap();
        assert_matches!(
            guard.check_capacity(past.id).await,
            Err(EventHubError::InvalidState(msg)) if msg.contains("already occurred")
        );

        let mut suspended = event(5);
        suspended.status = EventStatus::Suspended;
        let suspended = store.insert_event(suspended).await.unwrap();
        assert_matches!(
            guard.check_capacity(suspended.id).await,
            Err(EventHubError::InvalidState(_))
        );
    }
}
