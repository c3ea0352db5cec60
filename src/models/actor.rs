//! Caller identity
//!
//! The calling layer resolves who is acting before invoking any core
//! operation; the core never inspects request shapes itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::models::Event;
use crate::utils::errors::EventHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    User,
    Organizer,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::User => "user",
            ActorRole::Organizer => "organizer",
            ActorRole::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(ActorRole::User),
            "organizer" => Ok(ActorRole::Organizer),
            "admin" => Ok(ActorRole::Admin),
            other => Err(EventHubError::Validation(format!("Unknown actor role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn user(id: Uuid) -> Self {
        Self::new(id, ActorRole::User)
    }

    pub fn organizer(id: Uuid) -> Self {
        Self::new(id, ActorRole::Organizer)
    }

    pub fn admin(id: Uuid) -> Self {
        Self::new(id, ActorRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    /// Admins manage every event, organizers only their own
    pub fn manages(&self, event: &Event) -> bool {
        match self.role {
            ActorRole::Admin => true,
            ActorRole::Organizer => event.organizer_id == self.id,
            ActorRole::User => false,
        }
    }

    pub fn ensure_manages(&self, event: &Event) -> Result<(), EventHubError> {
        if self.manages(event) {
            Ok(())
        } else {
            Err(EventHubError::Unauthorized(format!(
                "{} {} cannot manage event {}",
                self.role, self.id, event.id
            )))
        }
    }

    /// The actor may act on `user_id`'s own behalf
    pub fn ensure_self_or_admin(&self, user_id: Uuid) -> Result<(), EventHubError> {
        if self.id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(EventHubError::Unauthorized(format!(
                "{} {} cannot act for user {}",
                self.role, self.id, user_id
            )))
        }
    }
}
