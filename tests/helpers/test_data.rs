//! Fixture builders

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use EventHub::models::{Event, EventStatus, User};

/// Event fixture relative to the test clock
#[derive(Debug, Clone)]
pub struct EventFixture {
    pub organizer_id: Uuid,
    pub title: String,
    pub capacity: i32,
    pub is_published: bool,
    pub is_paid: bool,
    pub starts_in: Duration,
    pub status: EventStatus,
}

impl EventFixture {
    /// Published free event with unlimited capacity starting in ten days
    pub fn new(organizer_id: Uuid) -> Self {
        Self {
            organizer_id,
            title: "Lindy Hop Social".to_string(),
            capacity: 0,
            is_published: true,
            is_paid: false,
            starts_in: Duration::days(10),
            status: EventStatus::Active,
        }
    }

    pub fn capacity(mut self, capacity: i32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn paid(mut self) -> Self {
        self.is_paid = true;
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    pub fn starts_in(mut self, starts_in: Duration) -> Self {
        self.starts_in = starts_in;
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self, now: DateTime<Utc>) -> Event {
        let start_date = now + self.starts_in;
        Event {
            id: Uuid::new_v4(),
            organizer_id: self.organizer_id,
            title: self.title,
            capacity: self.capacity,
            is_published: self.is_published,
            is_paid: self.is_paid,
            price_cents: if self.is_paid { 2500 } else { 0 },
            start_date,
            end_date: start_date + Duration::hours(4),
            status: self.status,
            attendees_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserFixture {
    pub name: String,
    pub email: String,
}

impl UserFixture {
    pub fn named(name: &str) -> Self {
        let slug = name.to_lowercase().replace(' ', ".");
        Self {
            name: name.to_string(),
            email: format!("{}.{}@example.com", slug, &Uuid::new_v4().simple().to_string()[..8]),
        }
    }

    pub fn build(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: None,
            is_manual: false,
            created_at: now,
        }
    }
}
