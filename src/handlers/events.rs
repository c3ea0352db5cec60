//! Event routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use super::AppState;
use crate::models::{Actor, CreateEventRequest, Event, SavedEvent};
use crate::services::CapacityCheck;
use crate::utils::errors::Result;

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.services.event_service.create_event(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(State(state): State<AppState>, Path(event_id): Path<Uuid>) -> Result<Json<Event>> {
    let event = state.services.event_service.find_event(event_id).await?;
    Ok(Json(event))
}

pub async fn get_capacity(State(state): State<AppState>, Path(event_id): Path<Uuid>) -> Result<Json<CapacityCheck>> {
    let check = state.services.registration_service.check_capacity(event_id).await?;
    Ok(Json(check))
}

pub async fn save_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<SavedEvent>> {
    let saved = state.services.event_service.save_event(event_id, &actor).await?;
    Ok(Json(saved))
}
