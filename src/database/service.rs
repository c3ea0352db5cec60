//! Database service layer
//! 
//! PostgreSQL-backed [`EntityStore`], composed of the per-table repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::database::{health_check, DatabasePool, EventRepository, NotificationRepository, RegistrationRepository, UserRepository};
use crate::database::store::{EntityStore, EventRemoval, Recount};
use crate::models::*;
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub users: UserRepository,
    pub notifications: NotificationRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl EntityStore for DatabaseService {
    async fn ping(&self) -> Result<()> {
        health_check(&self.pool).await
    }

    async fn insert_event(&self, event: Event) -> Result<Event> {
        self.events.create(&event).await
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn list_event_ids(&self) -> Result<Vec<Uuid>> {
        self.events.list_ids().await
    }

    async fn set_event_status(&self, id: Uuid, status: EventStatus, at: DateTime<Utc>) -> Result<Option<Event>> {
        self.events.set_status(id, status, at).await
    }

    async fn remove_event_if_unregistered(&self, id: Uuid) -> Result<EventRemoval> {
        self.events.delete_if_unregistered(id).await
    }

    async fn increment_attendees_count(&self, event_id: Uuid, delta: i32) -> Result<Option<i32>> {
        self.events.increment_attendees(event_id, delta).await
    }

    async fn recount_attendees(&self, event_id: Uuid) -> Result<Option<Recount>> {
        self.events.recount_attendees(event_id).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.find_by_email(email).await
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        self.users.create(&user).await
    }

    async fn find_or_create_user(&self, candidate: User) -> Result<(User, bool)> {
        self.users.find_or_create(&candidate).await
    }

    async fn insert_registration(&self, registration: Registration, limit: Option<CapacityLimit>) -> Result<RegistrationWrite> {
        self.registrations.create(&registration, limit).await
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>> {
        self.registrations.find_by_id(id).await
    }

    async fn find_registration_for(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<Registration>> {
        self.registrations.find_for(event_id, user_id).await
    }

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        self.registrations.list_for_event(event_id).await
    }

    async fn count_registrations(&self, event_id: Uuid, statuses: &[RegistrationStatus]) -> Result<i64> {
        self.registrations.count(event_id, statuses).await
    }

    async fn transition_registration(&self, change: StatusChange) -> Result<TransitionOutcome> {
        self.registrations.transition(&change).await
    }

    async fn set_attendance(&self, registration_id: Uuid, attended: bool, at: DateTime<Utc>) -> Result<Option<Registration>> {
        self.registrations.set_attendance(registration_id, attended, at).await
    }

    async fn save_event(&self, saved: SavedEvent) -> Result<SavedEvent> {
        self.events.save_for_user(&saved).await
    }

    async fn count_saved_events(&self, event_id: Uuid) -> Result<i64> {
        self.events.count_saved(event_id).await
    }

    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        self.notifications.create(&notification).await
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.notifications.list_for_user(user_id).await
    }
}
