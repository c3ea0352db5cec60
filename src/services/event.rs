//! Event service implementation
//!
//! Event creation, bookmarks and deletion. Deletion only removes events
//! nobody ever registered for; otherwise the event is cancelled in place
//! and its registrations are kept.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use crate::database::{EntityStore, EventRemoval};
use crate::models::{Actor, ActorRole, CreateEventRequest, Event, EventStatus, NotificationKind, SavedEvent};
use crate::services::notification::{Announcer, Dispatcher};
use crate::utils::clock::Clock;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::sanitize_input;
use crate::utils::logging::log_admin_action;

/// Outcome of [`EventService::delete_event`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventDeletion {
    /// Physically removed together with its bookmarks
    Deleted { event_id: Uuid, saved_events_removed: u64 },
    /// Registrations exist; the event was cancelled instead
    Cancelled { event: Event, notified: usize },
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    announcer: Announcer,
}

impl EventService {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            announcer: Announcer::new(store.clone(), dispatcher),
            store,
            clock,
        }
    }

    /// Create an event owned by the acting organizer
    pub async fn create_event(&self, actor: &Actor, request: CreateEventRequest) -> Result<Event> {
        if actor.role == ActorRole::User {
            return Err(EventHubError::Unauthorized(format!("user {} cannot create events", actor.id)));
        }
        request.validate()?;

        let now = self.clock.now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: actor.id,
            title: sanitize_input(&request.title),
            capacity: request.capacity,
            is_published: request.is_published,
            is_paid: request.is_paid,
            price_cents: request.price_cents,
            start_date: request.start_date,
            end_date: request.end_date,
            status: EventStatus::Active,
            attendees_count: 0,
            created_at: now,
            updated_at: now,
        };

        let event = self.store.insert_event(event).await?;
        info!(event_id = %event.id, organizer_id = %event.organizer_id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    pub async fn find_event(&self, event_id: Uuid) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))
    }

    /// Bookmark an event for the acting user; repeated saves return the same bookmark
    pub async fn save_event(&self, event_id: Uuid, actor: &Actor) -> Result<SavedEvent> {
        self.find_event(event_id).await?;

        let saved = self
            .store
            .save_event(SavedEvent {
                id: Uuid::new_v4(),
                event_id,
                user_id: actor.id,
                created_at: self.clock.now(),
            })
            .await?;
        debug!(event_id = %event_id, user_id = %actor.id, "Event saved");
        Ok(saved)
    }

    /// Delete an event, falling back to cancellation when it has registrations
    pub async fn delete_event(&self, event_id: Uuid, actor: &Actor) -> Result<EventDeletion> {
        let event = self.find_event(event_id).await?;
        actor.ensure_manages(&event)?;

        match self.store.remove_event_if_unregistered(event_id).await? {
            EventRemoval::Removed { saved_events_removed } => {
                log_admin_action(actor.id, "delete_event", Some(event_id.to_string().as_str()), None);
                Ok(EventDeletion::Deleted { event_id, saved_events_removed })
            }
            EventRemoval::NotFound => Err(EventHubError::event_not_found(event_id)),
            EventRemoval::HasRegistrations { registrations } => {
                let already_cancelled = event.status == EventStatus::Cancelled;
                let event = self
                    .store
                    .set_event_status(event_id, EventStatus::Cancelled, self.clock.now())
                    .await?
                    .ok_or_else(|| EventHubError::event_not_found(event_id))?;

                let notified = if already_cancelled { 0 } else { self.notify_registrants(&event).await? };
                let details = format!("{} registrations kept, {} registrants notified", registrations, notified);
                log_admin_action(actor.id, "cancel_event", Some(event_id.to_string().as_str()), Some(details.as_str()));

                Ok(EventDeletion::Cancelled { event, notified })
            }
        }
    }

    async fn notify_registrants(&self, event: &Event) -> Result<usize> {
        let registrations = self.store.list_registrations(event.id).await?;
        let mut notified = 0;
        for registration in registrations.iter().filter(|r| r.status.occupies_slot()) {
            self.announcer
                .announce(event, registration.user_id, NotificationKind::EventCancelled, None)
                .await;
            notified += 1;
        }
        Ok(notified)
    }
}
