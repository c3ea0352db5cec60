//! Entity store contract
//!
//! Every write that protects an invariant is a single atomic operation on
//! the store: admission (uniqueness + capacity), compare-and-set status
//! changes, attendee counter increments and recounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::models::{
    CapacityLimit, Event, EventStatus, Notification, Registration, RegistrationStatus, RegistrationWrite,
    SavedEvent, StatusChange, TransitionOutcome, User,
};
use crate::utils::errors::Result;

/// Outcome of a conditional hard delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRemoval {
    Removed { saved_events_removed: u64 },
    /// Registrations exist, nothing was deleted
    HasRegistrations { registrations: i64 },
    NotFound,
}

/// Attendee counter before and after a recount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recount {
    pub event_id: Uuid,
    pub previous: i32,
    pub recomputed: i32,
}

impl Recount {
    pub fn drifted(&self) -> bool {
        self.previous != self.recomputed
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Cheap round trip proving the backend is reachable
    async fn ping(&self) -> Result<()>;

    // Events

    async fn insert_event(&self, event: Event) -> Result<Event>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>>;

    async fn list_event_ids(&self) -> Result<Vec<Uuid>>;

    async fn set_event_status(&self, id: Uuid, status: EventStatus, at: DateTime<Utc>) -> Result<Option<Event>>;

    /// Delete the event and its bookmarks, only if it has no registrations at all
    async fn remove_event_if_unregistered(&self, id: Uuid) -> Result<EventRemoval>;

    /// Atomic `attendees_count += delta`, clamped at 0. `None` if the event is gone.
    async fn increment_attendees_count(&self, event_id: Uuid, delta: i32) -> Result<Option<i32>>;

    /// Overwrite `attendees_count` with the number of confirmed registrations.
    /// Serialised with registration writes on the same event.
    async fn recount_attendees(&self, event_id: Uuid) -> Result<Option<Recount>>;

    // Users

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn insert_user(&self, user: User) -> Result<User>;

    /// Return the user owning `candidate.email`, inserting `candidate` if none.
    /// The flag is true when a new user was created.
    async fn find_or_create_user(&self, candidate: User) -> Result<(User, bool)>;

    // Registrations

    /// Insert a registration. Fails with `Duplicate` when the (event, user)
    /// pair already exists and with `Capacity` when `limit` is reached; both
    /// checks and the attendee counter change happen atomically with the insert.
    async fn insert_registration(&self, registration: Registration, limit: Option<CapacityLimit>) -> Result<RegistrationWrite>;

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>>;

    async fn find_registration_for(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<Registration>>;

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>>;

    async fn count_registrations(&self, event_id: Uuid, statuses: &[RegistrationStatus]) -> Result<i64>;

    /// Compare-and-set on the current status, applying the attendee counter
    /// change in the same step. Leaving `confirmed` clears `attendance_status`.
    async fn transition_registration(&self, change: StatusChange) -> Result<TransitionOutcome>;

    /// Set attendance on a confirmed registration; `None` if missing or not confirmed
    async fn set_attendance(&self, registration_id: Uuid, attended: bool, at: DateTime<Utc>) -> Result<Option<Registration>>;

    // Bookmarks

    async fn save_event(&self, saved: SavedEvent) -> Result<SavedEvent>;

    async fn count_saved_events(&self, event_id: Uuid) -> Result<i64>;

    // Notifications

    async fn insert_notification(&self, notification: Notification) -> Result<Notification>;

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>>;
}
