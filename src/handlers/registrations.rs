//! Registration routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use super::AppState;
use crate::models::{Actor, AttendanceRequest, RegisterRequest, Registration, UpdateStatusRequest};
use crate::utils::errors::Result;

/// `POST /registrations/events/:event_id`
pub async fn register(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
    body: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<Registration>)> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let registration = state
        .services
        .registration_service
        .register_for_event(event_id, actor.id, &actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `DELETE /registrations/events/:event_id`
pub async fn cancel(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .cancel_registration(event_id, actor.id, &actor)
        .await?;
    Ok(Json(registration))
}

pub async fn get_registration(
    State(state): State<AppState>,
    actor: Actor,
    Path(registration_id): Path<Uuid>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .get_registration(registration_id, &actor)
        .await?;
    Ok(Json(registration))
}

/// `PUT /registrations/:registration_id/status`
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(registration_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .update_registration_status(registration_id, &request.status, &actor)
        .await?;
    Ok(Json(registration))
}

/// `PUT /registrations/:registration_id/attendance`
pub async fn mark_attendance(
    State(state): State<AppState>,
    actor: Actor,
    Path(registration_id): Path<Uuid>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .mark_attendance(registration_id, request.attended, &actor)
        .await?;
    Ok(Json(registration))
}

/// `POST /registrations/:registration_id/confirm-payment`
pub async fn confirm_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(registration_id): Path<Uuid>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .confirm_payment(registration_id, &actor)
        .await?;
    Ok(Json(registration))
}
