//! HTTP handlers module
//!
//! Thin axum routes over the registration services:
//! - `registrations` for self-service registration and staff status changes
//! - `organizer` for event staff tooling
//! - `events` for event creation, lookup and bookmarks

pub mod events;
pub mod organizer;
pub mod registrations;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::services::ServiceFactory;
use crate::utils::errors::{ErrorKind, EventHubError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceFactory>,
}

impl AppState {
    pub fn new(services: ServiceFactory) -> Self {
        Self { services: Arc::new(services) }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events::create_event))
        .route("/events/:event_id", get(events::get_event))
        .route("/events/:event_id/capacity", get(events::get_capacity))
        .route("/events/:event_id/save", post(events::save_event))
        .route(
            "/registrations/events/:event_id",
            post(registrations::register).delete(registrations::cancel),
        )
        .route("/registrations/:registration_id", get(registrations::get_registration))
        .route("/registrations/:registration_id/status", put(registrations::update_status))
        .route("/registrations/:registration_id/attendance", put(registrations::mark_attendance))
        .route("/registrations/:registration_id/confirm-payment", post(registrations::confirm_payment))
        .route("/organizer/events/:event_id", delete(organizer::delete_event))
        .route("/organizer/events/:event_id/attendees", post(organizer::add_attendee))
        .route(
            "/organizer/events/:event_id/attendees/:attendee_id/check-in",
            post(organizer::check_in),
        )
        .route("/organizer/events/:event_id/registrations", get(organizer::list_registrations))
        .route("/organizer/events/:event_id/recount", post(organizer::recount))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

/// HTTP status for an error kind
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Duplicate | ErrorKind::Capacity | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::WindowClosed | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for EventHubError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_code(kind);

        // internals stay in the log
        let message = if status.is_server_error() {
            tracing::error!(error = %self, kind = %kind, "Request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, kind = %kind, "Request rejected");
            self.to_string()
        };

        let body = json!({
            "error": {
                "kind": kind.as_str(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_code(ErrorKind::Capacity), StatusCode::CONFLICT);
        assert_eq!(status_code(ErrorKind::WindowClosed), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_code(ErrorKind::Storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = EventHubError::Storage("connection reset by peer".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
