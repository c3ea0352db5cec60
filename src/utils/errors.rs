//! Error handling for EventHub
//!
//! This module defines the error taxonomy shared by the registration engine,
//! the entity stores and the HTTP layer. Every variant maps to a stable
//! machine-readable [`ErrorKind`].

use thiserror::Error;
use uuid::Uuid;

/// Main error type for EventHub
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Registration already exists for event {event_id} and user {user_id}")]
    Duplicate { event_id: Uuid, user_id: Uuid },

    #[error("Event {event_id} is full ({occupied}/{capacity} slots taken)")]
    Capacity {
        event_id: Uuid,
        capacity: i32,
        occupied: i64,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cancellation window closed: self-service cancellation for event {event_id} ends {window_hours}h before start")]
    WindowClosed { event_id: Uuid, window_hours: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Capacity,
    InvalidState,
    WindowClosed,
    Validation,
    Unauthorized,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Capacity => "capacity",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::WindowClosed => "window_closed",
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EventHubError {
    pub fn event_not_found(id: Uuid) -> Self {
        EventHubError::NotFound { entity: "Event", id: id.to_string() }
    }

    pub fn registration_not_found(id: impl ToString) -> Self {
        EventHubError::NotFound { entity: "Registration", id: id.to_string() }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        EventHubError::NotFound { entity: "User", id: id.to_string() }
    }

    /// Machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventHubError::NotFound { .. } => ErrorKind::NotFound,
            EventHubError::Duplicate { .. } => ErrorKind::Duplicate,
            EventHubError::Capacity { .. } => ErrorKind::Capacity,
            EventHubError::InvalidState(_) => ErrorKind::InvalidState,
            EventHubError::WindowClosed { .. } => ErrorKind::WindowClosed,
            EventHubError::Validation(_) => ErrorKind::Validation,
            EventHubError::Unauthorized(_) => ErrorKind::Unauthorized,
            EventHubError::Database(_) | EventHubError::Storage(_) => ErrorKind::Storage,
            EventHubError::Migration(_)
            | EventHubError::Config(_)
            | EventHubError::Serialization(_)
            | EventHubError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error is recoverable by retrying the same request later
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::NotFound { .. } => false,
            EventHubError::Duplicate { .. } => false,
            EventHubError::Capacity { .. } => true,
            EventHubError::InvalidState(_) => false,
            EventHubError::WindowClosed { .. } => false,
            EventHubError::Validation(_) => false,
            EventHubError::Unauthorized(_) => false,
            EventHubError::Database(_) => true,
            EventHubError::Migration(_) => false,
            EventHubError::Storage(_) => true,
            EventHubError::Config(_) => false,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::Storage(_) => ErrorSeverity::Error,
            EventHubError::Unauthorized(_) => ErrorSeverity::Warning,
            EventHubError::NotFound { .. }
            | EventHubError::Duplicate { .. }
            | EventHubError::Capacity { .. }
            | EventHubError::InvalidState(_)
            | EventHubError::WindowClosed { .. }
            | EventHubError::Validation(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_share_kind() {
        let err = EventHubError::Storage("connection reset".to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_recoverable());

        let err = EventHubError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind().as_str(), "storage");
    }

    #[test]
    fn test_domain_errors_are_info() {
        let err = EventHubError::Capacity { event_id: Uuid::nil(), capacity: 1, occupied: 1 };
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert!(err.to_string().contains("1/1"));
    }

    #[test]
    fn test_not_found_helpers() {
        let id = Uuid::new_v4();
        let err = EventHubError::event_not_found(id);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), format!("Event not found: {}", id));
    }
}
