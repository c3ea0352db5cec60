//! Organizer routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use super::AppState;
use crate::database::Recount;
use crate::models::{Actor, CheckInRequest, ManualAttendeeRequest, Registration};
use crate::services::EventDeletion;
use crate::utils::errors::Result;

pub async fn add_attendee(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
    Json(request): Json<ManualAttendeeRequest>,
) -> Result<(StatusCode, Json<Registration>)> {
    let registration = state
        .services
        .registration_service
        .add_attendee_manually(event_id, &actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `attendee_id` is the registration id
pub async fn check_in(
    State(state): State<AppState>,
    actor: Actor,
    Path((event_id, attendee_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .check_in(event_id, attendee_id, request.status, &actor)
        .await?;
    Ok(Json(registration))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Registration>>> {
    let registrations = state
        .services
        .registration_service
        .list_event_registrations(event_id, &actor)
        .await?;
    Ok(Json(registrations))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventDeletion>> {
    let deletion = state.services.event_service.delete_event(event_id, &actor).await?;
    Ok(Json(deletion))
}

pub async fn recount(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Recount>> {
    let recount = state
        .services
        .registration_service
        .recount_attendees(event_id, &actor)
        .await?;
    Ok(Json(recount))
}
