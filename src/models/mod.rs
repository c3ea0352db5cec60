//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod actor;
pub mod event;
pub mod notification;
pub mod registration;
pub mod user;

// Re-export commonly used models
pub use actor::{Actor, ActorRole};
pub use event::{Event, EventStatus, CreateEventRequest, SavedEvent};
pub use notification::{Notification, NotificationKind, OutgoingEmail};
pub use registration::{
    Registration, RegistrationStatus, PaymentStatus, RegisterRequest, UpdateStatusRequest,
    AttendanceRequest, CheckInStatus, CheckInRequest, OccupancyRule, CapacityLimit,
    RegistrationWrite, StatusChange, TransitionOutcome,
};
pub use user::{User, ManualAttendeeRequest};
