//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::utils::errors::EventHubError;
use crate::utils::helpers::{is_valid_email, normalize_email, sanitize_input};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Created by an organizer on the attendee's behalf; cannot log in
    pub is_manual: bool,
    pub created_at: DateTime<Utc>,
}

/// Walk-in attendee added by an organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAttendeeRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub ticket_type: Option<String>,
}

impl ManualAttendeeRequest {
    /// Validate and return a cleaned copy
    pub fn normalized(&self) -> Result<Self, EventHubError> {
        let name = sanitize_input(&self.name);
        if name.is_empty() {
            return Err(EventHubError::Validation("Attendee name is required".to_string()));
        }
        if !is_valid_email(&self.email) {
            return Err(EventHubError::Validation(format!("Invalid email address: {}", self.email)));
        }

        Ok(Self {
            name,
            email: normalize_email(&self.email),
            phone: self.phone.as_deref().map(sanitize_input).filter(|p| !p.is_empty()),
            ticket_type: self.ticket_type.as_deref().map(sanitize_input).filter(|t| !t.is_empty()),
        })
    }
}
