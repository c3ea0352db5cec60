//! Test context for unified test setup

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use EventHub::config::Settings;
use EventHub::database::{EntityStore, MemoryStore};
use EventHub::models::{Actor, Event, NotificationKind, User};
use EventHub::services::{Dispatcher, ServiceFactory};
use EventHub::utils::clock::FixedClock;

use super::test_data::{EventFixture, UserFixture};

/// A message handed to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Notification { user_id: Uuid, kind: NotificationKind, related_event_id: Option<Uuid> },
    Email { to: String, subject: String },
}

/// Dispatcher that only records what it was asked to send
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    messages: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    pub fn messages(&self) -> Vec<Dispatched> {
        self.messages.lock().unwrap().clone()
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<NotificationKind> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Dispatched::Notification { user_id: id, kind, .. } if id == user_id => Some(kind),
                _ => None,
            })
            .collect()
    }

    pub fn emails_to(&self, address: &str) -> usize {
        self.messages()
            .iter()
            .filter(|m| matches!(m, Dispatched::Email { to, .. } if to == address))
            .count()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn notify(&self, user_id: Uuid, kind: NotificationKind, _title: String, _message: String, related_event_id: Option<Uuid>) {
        self.messages
            .lock()
            .unwrap()
            .push(Dispatched::Notification { user_id, kind, related_event_id });
    }

    fn send_email(&self, to: &str, subject: String, _body: String) {
        self.messages
            .lock()
            .unwrap()
            .push(Dispatched::Email { to: to.to_string(), subject });
    }
}

/// Unified test context over the in-memory store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub services: ServiceFactory,
    pub settings: Settings,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(test_epoch()));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let services = ServiceFactory::new(store.clone(), clock.clone(), dispatcher.clone(), &settings);

        Self {
            store,
            clock,
            dispatcher,
            services,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use EventHub::utils::clock::Clock;
        self.clock.now()
    }

    pub async fn seed_event(&self, fixture: EventFixture) -> Event {
        self.store.insert_event(fixture.build(self.now())).await.unwrap()
    }

    pub async fn seed_user(&self, name: &str) -> User {
        self.store
            .insert_user(UserFixture::named(name).build(self.now()))
            .await
            .unwrap()
    }

    /// Seed a user and return it with its self-service actor
    pub async fn seed_attendee(&self, name: &str) -> (User, Actor) {
        let user = self.seed_user(name).await;
        let actor = Actor::user(user.id);
        (user, actor)
    }

    pub async fn event(&self, event_id: Uuid) -> Event {
        self.store.find_event(event_id).await.unwrap().unwrap()
    }

    pub async fn attendees_count(&self, event_id: Uuid) -> i32 {
        self.event(event_id).await.attendees_count
    }

    /// Move the clock to `hours` before the event starts
    pub fn set_hours_before(&self, event: &Event, hours: i64) {
        self.clock.set(event.start_date - Duration::hours(hours));
    }
}

/// Fixed starting instant for every test
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}
