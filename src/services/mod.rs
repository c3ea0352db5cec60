//! Services module
//!
//! This module contains business logic services

pub mod capacity;
pub mod counter;
pub mod event;
pub mod notification;
pub mod registration;

// Re-export commonly used services
pub use capacity::{CapacityCheck, CapacityGuard};
pub use counter::AttendeeCounter;
pub use event::{EventDeletion, EventService};
pub use notification::{
    Announcer, DispatchStats, DispatchStatsSnapshot, Dispatcher, EmailSender, LogEmailSender, NotificationService,
    NotificationSink, StoreNotificationSink,
};
pub use registration::RegistrationService;

use serde::Serialize;
use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::EntityStore;
use crate::utils::clock::Clock;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub registration_service: RegistrationService,
    pub event_service: EventService,
    pub counter: AttendeeCounter,
    store: Arc<dyn EntityStore>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        store: Arc<dyn EntityStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
        settings: &Settings,
    ) -> Self {
        let registration_service = RegistrationService::new(
            store.clone(),
            clock.clone(),
            dispatcher.clone(),
            settings.registration.clone(),
        );
        let event_service = EventService::new(store.clone(), clock, dispatcher);
        let counter = registration_service.counter().clone();

        Self {
            registration_service,
            event_service,
            counter,
            store,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let store_error = self.store.ping().await.err().map(|e| e.to_string());

        ServiceHealthStatus {
            store_healthy: store_error.is_none(),
            store_error,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }
}
