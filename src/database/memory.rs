//! In-process entity store
//!
//! All tables live behind one write lock, so each trait method is atomic the
//! same way the PostgreSQL statements and transactions are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::database::store::{EntityStore, EventRemoval, Recount};
use crate::models::{
    CapacityLimit, Event, EventStatus, Notification, Registration, RegistrationStatus, RegistrationWrite,
    SavedEvent, StatusChange, TransitionOutcome, User,
};
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    users: HashMap<Uuid, User>,
    users_by_email: HashMap<String, Uuid>,
    registrations: HashMap<Uuid, Registration>,
    registrations_by_pair: HashMap<(Uuid, Uuid), Uuid>,
    saved_events: HashMap<Uuid, SavedEvent>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn count_registrations(&self, event_id: Uuid, statuses: &[RegistrationStatus]) -> i64 {
        self.registrations
            .values()
            .filter(|r| r.event_id == event_id && statuses.contains(&r.status))
            .count() as i64
    }

    fn adjust_attendees(&mut self, event_id: Uuid, delta: i32) -> Option<i32> {
        self.events.get_mut(&event_id).map(|event| {
            event.attendees_count = event.attendees_count.saturating_add(delta).max(0);
            event.attendees_count
        })
    }

    fn check_capacity(&self, event_id: Uuid, limit: &CapacityLimit, excluding: Option<Uuid>) -> Result<()> {
        let occupied = self
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && Some(r.id) != excluding && limit.rule.statuses().contains(&r.status))
            .count() as i64;

        if limit.admits(occupied) {
            Ok(())
        } else {
            Err(EventHubError::Capacity { event_id, capacity: limit.capacity, occupied })
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_event(&self, event: Event) -> Result<Event> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(EventHubError::Storage(format!("Event {} already exists", event.id)));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_event_ids(&self) -> Result<Vec<Uuid>> {
        let tables = self.tables.read().await;
        let mut events: Vec<&Event> = tables.events.values().collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events.into_iter().map(|e| e.id).collect())
    }

    async fn set_event_status(&self, id: Uuid, status: EventStatus, at: DateTime<Utc>) -> Result<Option<Event>> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.get_mut(&id).map(|event| {
            event.status = status;
            event.updated_at = at;
            event.clone()
        }))
    }

    async fn remove_event_if_unregistered(&self, id: Uuid) -> Result<EventRemoval> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&id) {
            return Ok(EventRemoval::NotFound);
        }

        let registrations = tables.count_registrations(id, &RegistrationStatus::ALL);
        if registrations > 0 {
            return Ok(EventRemoval::HasRegistrations { registrations });
        }

        let before = tables.saved_events.len();
        tables.saved_events.retain(|_, saved| saved.event_id != id);
        let saved_events_removed = (before - tables.saved_events.len()) as u64;
        tables.events.remove(&id);

        Ok(EventRemoval::Removed { saved_events_removed })
    }

    async fn increment_attendees_count(&self, event_id: Uuid, delta: i32) -> Result<Option<i32>> {
        Ok(self.tables.write().await.adjust_attendees(event_id, delta))
    }

    async fn recount_attendees(&self, event_id: Uuid) -> Result<Option<Recount>> {
        let mut tables = self.tables.write().await;
        let confirmed = tables.count_registrations(event_id, &[RegistrationStatus::Confirmed]);
        let recomputed = i32::try_from(confirmed)
            .map_err(|_| EventHubError::Storage(format!("Attendee count overflow for event {}", event_id)))?;

        Ok(tables.events.get_mut(&event_id).map(|event| {
            let previous = event.attendees_count;
            event.attendees_count = recomputed;
            Recount { event_id, previous, recomputed }
        }))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users_by_email.contains_key(&user.email) {
            return Err(EventHubError::Validation(format!("Email already in use: {}", user.email)));
        }
        tables.users_by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_or_create_user(&self, candidate: User) -> Result<(User, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .users_by_email
            .get(&candidate.email)
            .and_then(|id| tables.users.get(id))
        {
            return Ok((existing.clone(), false));
        }
        tables.users_by_email.insert(candidate.email.clone(), candidate.id);
        tables.users.insert(candidate.id, candidate.clone());
        Ok((candidate, true))
    }

    async fn insert_registration(&self, registration: Registration, limit: Option<CapacityLimit>) -> Result<RegistrationWrite> {
        let mut tables = self.tables.write().await;
        let event_id = registration.event_id;

        if !tables.events.contains_key(&event_id) {
            return Err(EventHubError::event_not_found(event_id));
        }
        if tables.registrations_by_pair.contains_key(&(event_id, registration.user_id)) {
            return Err(EventHubError::Duplicate { event_id, user_id: registration.user_id });
        }
        if let Some(limit) = limit {
            tables.check_capacity(event_id, &limit, None)?;
        }

        tables
            .registrations_by_pair
            .insert((event_id, registration.user_id), registration.id);
        tables.registrations.insert(registration.id, registration.clone());
        let attendees_count = tables
            .adjust_attendees(event_id, i32::from(registration.status.counts_as_attendee()))
            .ok_or_else(|| EventHubError::event_not_found(event_id))?;

        Ok(RegistrationWrite { registration, attendees_count })
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>> {
        Ok(self.tables.read().await.registrations.get(&id).cloned())
    }

    async fn find_registration_for(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations_by_pair
            .get(&(event_id, user_id))
            .and_then(|id| tables.registrations.get(id))
            .cloned())
    }

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        let mut registrations: Vec<Registration> = tables
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.registration_date);
        Ok(registrations)
    }

    async fn count_registrations(&self, event_id: Uuid, statuses: &[RegistrationStatus]) -> Result<i64> {
        Ok(self.tables.read().await.count_registrations(event_id, statuses))
    }

    async fn transition_registration(&self, change: StatusChange) -> Result<TransitionOutcome> {
        let mut tables = self.tables.write().await;
        let current = match tables.registrations.get(&change.registration_id) {
            Some(registration) => registration.clone(),
            None => return Ok(TransitionOutcome::NotFound),
        };

        if current.status != change.expected {
            return Ok(TransitionOutcome::Conflict(current));
        }

        if !tables.events.contains_key(&current.event_id) {
            return Err(EventHubError::event_not_found(current.event_id));
        }

        let entering_slot = !current.status.occupies_slot() && change.status.occupies_slot();
        if let (true, Some(limit)) = (entering_slot, change.capacity) {
            tables.check_capacity(current.event_id, &limit, Some(current.id))?;
        }

        let registration = match tables.registrations.get_mut(&change.registration_id) {
            Some(registration) => registration,
            None => return Ok(TransitionOutcome::NotFound),
        };
        registration.status = change.status;
        registration.payment_status = change.payment_status;
        if change.status != RegistrationStatus::Confirmed {
            registration.attendance_status = false;
        }
        registration.updated_at = change.at;
        let registration = registration.clone();

        let attendees_count = tables
            .adjust_attendees(current.event_id, current.status.attendee_delta(change.status))
            .ok_or_else(|| EventHubError::event_not_found(current.event_id))?;

        Ok(TransitionOutcome::Applied(RegistrationWrite { registration, attendees_count }))
    }

    async fn set_attendance(&self, registration_id: Uuid, attended: bool, at: DateTime<Utc>) -> Result<Option<Registration>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .registrations
            .get_mut(&registration_id)
            .filter(|r| r.status == RegistrationStatus::Confirmed)
            .map(|registration| {
                registration.attendance_status = attended;
                registration.updated_at = at;
                registration.clone()
            }))
    }

    async fn save_event(&self, saved: SavedEvent) -> Result<SavedEvent> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&saved.event_id) {
            return Err(EventHubError::event_not_found(saved.event_id));
        }
        if let Some(existing) = tables
            .saved_events
            .values()
            .find(|s| s.event_id == saved.event_id && s.user_id == saved.user_id)
        {
            return Ok(existing.clone());
        }
        tables.saved_events.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn count_saved_events(&self, event_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.saved_events.values().filter(|s| s.event_id == event_id).count() as i64)
    }

    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        self.tables.write().await.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }
}
