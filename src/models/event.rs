//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::utils::errors::EventHubError;

/// Lifecycle status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Suspended,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Suspended => "suspended",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(EventStatus::Active),
            "suspended" => Ok(EventStatus::Suspended),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(EventHubError::Validation(format!("Unknown event status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    /// Maximum occupied slots; 0 means unlimited
    pub capacity: i32,
    pub is_published: bool,
    pub is_paid: bool,
    pub price_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: EventStatus,
    /// Denormalized count of confirmed registrations
    pub attendees_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub capacity: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub price_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), EventHubError> {
        if self.title.trim().is_empty() {
            return Err(EventHubError::Validation("Event title is required".to_string()));
        }
        if self.capacity < 0 {
            return Err(EventHubError::Validation("Capacity cannot be negative".to_string()));
        }
        if self.price_cents < 0 {
            return Err(EventHubError::Validation("Price cannot be negative".to_string()));
        }
        if self.end_date < self.start_date {
            return Err(EventHubError::Validation("Event cannot end before it starts".to_string()));
        }
        Ok(())
    }
}

/// A user's bookmark of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEvent {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> CreateEventRequest {
        let start = Utc::now() + Duration::days(3);
        CreateEventRequest {
            title: "Lindy Exchange".to_string(),
            capacity: 10,
            is_published: true,
            is_paid: false,
            price_cents: 0,
            start_date: start,
            end_date: start + Duration::hours(4),
        }
    }

    #[test]
    fn test_event_status_parsing() {
        assert_eq!("Cancelled".parse::<EventStatus>().unwrap(), EventStatus::Cancelled);
        assert!("archived".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_create_request_validation() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.capacity = -1;
        assert!(bad.validate().is_err());

        let mut bad = request();
        bad.end_date = bad.start_date - Duration::hours(1);
        assert!(bad.validate().is_err());
    }
}
