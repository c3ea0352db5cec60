//! Registration model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::utils::errors::EventHubError;

/// Registration lifecycle status
///
/// `pending` may move to `confirmed` or `cancelled`, `confirmed` only to
/// `cancelled`; staff status updates may set any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 3] = [
        RegistrationStatus::Pending,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the registration holds a capacity slot
    pub fn occupies_slot(&self) -> bool {
        matches!(self, RegistrationStatus::Pending | RegistrationStatus::Confirmed)
    }

    /// Whether the registration is included in `Event::attendees_count`
    pub fn counts_as_attendee(&self) -> bool {
        matches!(self, RegistrationStatus::Confirmed)
    }

    /// Signed attendee counter change for a transition from `self` to `next`
    pub fn attendee_delta(&self, next: RegistrationStatus) -> i32 {
        i32::from(next.counts_as_attendee()) - i32::from(self.counts_as_attendee())
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RegistrationStatus::Pending),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            other => Err(EventHubError::Validation(format!(
                "Invalid registration status '{}', expected one of pending, confirmed, cancelled",
                other
            ))),
        }
    }
}

/// Payment state, independent of the registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NotApplicable,
    Pending,
    Completed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotApplicable => "not_applicable",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Payment status a fresh self-service registration starts with
    pub fn initial(is_paid: bool) -> Self {
        if is_paid {
            PaymentStatus::Pending
        } else {
            PaymentStatus::NotApplicable
        }
    }

    /// Payment status once the registration is cancelled
    pub fn after_cancellation(self) -> Self {
        match self {
            PaymentStatus::Completed => PaymentStatus::Refunded,
            other => other,
        }
    }

    /// `not_applicable` exactly when the event is free
    pub fn is_consistent_with(&self, is_paid: bool) -> bool {
        (*self == PaymentStatus::NotApplicable) != is_paid
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_applicable" | "free" => Ok(PaymentStatus::NotApplicable),
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(EventHubError::Validation(format!("Invalid payment status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    /// Physical check-in; only ever true while `status` is confirmed
    pub attendance_status: bool,
    pub registration_date: DateTime<Utc>,
    pub ticket_type: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub ticket_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRequest {
    pub attended: bool,
}

/// Organizer check-in states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckInStatus {
    CheckedIn,
    NotCheckedIn,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub status: CheckInStatus,
}

/// Which registrations count against the capacity ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyRule {
    /// Pending registrations reserve a slot
    ReservePending,
    /// Only confirmed registrations are counted
    ConfirmedOnly,
}

impl OccupancyRule {
    pub fn statuses(&self) -> &'static [RegistrationStatus] {
        match self {
            OccupancyRule::ReservePending => &[RegistrationStatus::Pending, RegistrationStatus::Confirmed],
            OccupancyRule::ConfirmedOnly => &[RegistrationStatus::Confirmed],
        }
    }
}

/// Capacity ceiling enforced atomically by the store on admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimit {
    pub capacity: i32,
    pub rule: OccupancyRule,
}

impl CapacityLimit {
    /// `None` for unlimited events
    pub fn for_capacity(capacity: i32, rule: OccupancyRule) -> Option<Self> {
        (capacity > 0).then_some(Self { capacity, rule })
    }

    pub fn admits(&self, occupied: i64) -> bool {
        occupied < i64::from(self.capacity)
    }
}

/// Compare-and-set status change applied by the store
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub registration_id: Uuid,
    pub expected: RegistrationStatus,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    /// Checked when the change moves the registration into an occupying status
    pub capacity: Option<CapacityLimit>,
    pub at: DateTime<Utc>,
}

/// A registration write together with the attendee counter it produced.
/// The store applies the counter change in the same atomic step as the row.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationWrite {
    pub registration: Registration,
    pub attendees_count: i32,
}

/// Result of a compare-and-set status change
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(RegistrationWrite),
    /// Status no longer matched the expected value; carries the current row
    Conflict(Registration),
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendee_delta() {
        use RegistrationStatus::*;
        assert_eq!(Pending.attendee_delta(Confirmed), 1);
        assert_eq!(Confirmed.attendee_delta(Cancelled), -1);
        assert_eq!(Pending.attendee_delta(Cancelled), 0);
        assert_eq!(Confirmed.attendee_delta(Confirmed), 0);
        assert_eq!(Cancelled.attendee_delta(Confirmed), 1);
    }

    #[test]
    fn test_invalid_status_is_validation_error() {
        let err = "attended".parse::<RegistrationStatus>().unwrap_err();
        assert!(matches!(err, EventHubError::Validation(_)));
    }

    #[test]
    fn test_payment_status_free_alias() {
        assert_eq!("free".parse::<PaymentStatus>().unwrap(), PaymentStatus::NotApplicable);
        assert!(PaymentStatus::NotApplicable.is_consistent_with(false));
        assert!(!PaymentStatus::NotApplicable.is_consistent_with(true));
        assert!(PaymentStatus::Pending.is_consistent_with(true));
    }

    #[test]
    fn test_capacity_limit() {
        assert!(CapacityLimit::for_capacity(0, OccupancyRule::ReservePending).is_none());
        let limit = CapacityLimit::for_capacity(2, OccupancyRule::ReservePending).unwrap();
        assert!(limit.admits(1));
        assert!(!limit.admits(2));
    }

    #[test]
    fn test_check_in_status_wire_format() {
        let parsed: CheckInRequest = serde_json::from_str(r#"{"status":"not-checked-in"}"#).unwrap();
        assert_eq!(parsed.status, CheckInStatus::NotCheckedIn);
    }
}
