//! Notification service implementation
//!
//! Registration transitions emit notifications and emails through the
//! [`Dispatcher`] trait. Emission is a non-blocking channel send; a
//! background worker delivers messages and logs failures, so a delivery
//! problem can never fail or roll back the transition that produced it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::config::NotificationConfig;
use crate::database::EntityStore;
use crate::models::{Event, Notification, NotificationKind, OutgoingEmail, RegistrationStatus};
use crate::utils::clock::Clock;
use crate::utils::errors::Result;
use crate::utils::helpers::format_timestamp;
use crate::utils::logging::log_dispatch_failure;

/// Fire-and-forget outbound messaging
pub trait Dispatcher: Send + Sync {
    fn notify(&self, user_id: Uuid, kind: NotificationKind, title: String, message: String, related_event_id: Option<Uuid>);

    fn send_email(&self, to: &str, subject: String, body: String);
}

/// Final destination of in-app notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Final destination of emails
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Persists notifications through the entity store
pub struct StoreNotificationSink {
    store: Arc<dyn EntityStore>,
}

impl StoreNotificationSink {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationSink for StoreNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.store.insert_notification(notification.clone()).await?;
        Ok(())
    }
}

/// Writes emails to the log; actual mail delivery lives outside this service
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(from = %email.from, to = %email.to, subject = %email.subject, "Email handed off");
        Ok(())
    }
}

#[derive(Debug)]
enum DispatchMessage {
    Notify(Notification),
    Email(OutgoingEmail),
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Channel-backed [`Dispatcher`] with a background delivery worker
#[derive(Clone)]
pub struct NotificationService {
    sender: mpsc::UnboundedSender<DispatchMessage>,
    clock: Arc<dyn Clock>,
    stats: Arc<DispatchStats>,
    email_from: String,
    enabled: bool,
}

impl NotificationService {
    /// Start the delivery worker. The worker exits once every clone of the
    /// returned service has been dropped and the queue is drained.
    pub fn spawn(
        sink: Arc<dyn NotificationSink>,
        mailer: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        config: &NotificationConfig,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());
        let worker = tokio::spawn(Self::run(receiver, sink, mailer, stats.clone()));

        let service = Self {
            sender,
            clock,
            stats,
            email_from: config.email_from.clone(),
            enabled: config.enabled,
        };
        (service, worker)
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared counters that outlive this handle
    pub fn stats_handle(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    async fn run(
        mut receiver: mpsc::UnboundedReceiver<DispatchMessage>,
        sink: Arc<dyn NotificationSink>,
        mailer: Arc<dyn EmailSender>,
        stats: Arc<DispatchStats>,
    ) {
        while let Some(message) = receiver.recv().await {
            let outcome = match &message {
                DispatchMessage::Notify(notification) => sink
                    .deliver(notification)
                    .await
                    .map_err(|e| ("notification", notification.user_id.to_string(), e)),
                DispatchMessage::Email(email) => mailer
                    .send(email)
                    .await
                    .map_err(|e| ("email", email.to.clone(), e)),
            };

            match outcome {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err((channel, recipient, error)) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    log_dispatch_failure(channel, &recipient, &error);
                }
            }
        }

        debug!("Dispatch worker stopped");
    }

    fn enqueue(&self, message: DispatchMessage) {
        if !self.enabled {
            return;
        }
        if self.sender.send(message).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Dispatch worker is gone, message dropped");
        }
    }
}

impl Dispatcher for NotificationService {
    fn notify(&self, user_id: Uuid, kind: NotificationKind, title: String, message: String, related_event_id: Option<Uuid>) {
        self.enqueue(DispatchMessage::Notify(Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title,
            message,
            related_event_id,
            is_read: false,
            created_at: self.clock.now(),
        }));
    }

    fn send_email(&self, to: &str, subject: String, body: String) {
        self.enqueue(DispatchMessage::Email(OutgoingEmail {
            from: self.email_from.clone(),
            to: to.to_string(),
            subject,
            body,
        }));
    }
}

/// Title and body for a registration-related message
pub fn render(kind: NotificationKind, event: &Event, status: Option<RegistrationStatus>) -> (String, String) {
    let when = format_timestamp(event.start_date);
    match kind {
        NotificationKind::RegistrationConfirmed => (
            "Registration confirmed".to_string(),
            format!("You're confirmed for {} on {}.", event.title, when),
        ),
        NotificationKind::RegistrationPending => (
            "Registration received".to_string(),
            format!("Your spot for {} on {} is reserved until payment completes.", event.title, when),
        ),
        NotificationKind::RegistrationCancelled => (
            "Registration cancelled".to_string(),
            format!("Your registration for {} on {} has been cancelled.", event.title, when),
        ),
        NotificationKind::RegistrationStatusUpdated => (
            "Registration updated".to_string(),
            format!(
                "Your registration for {} is now {}.",
                event.title,
                status.map(|s| s.as_str()).unwrap_or("updated")
            ),
        ),
        NotificationKind::EventCancelled => (
            "Event cancelled".to_string(),
            format!("{} on {} has been cancelled by the organizer.", event.title, when),
        ),
    }
}

/// Resolves recipients and emits notification + email for one registrant
#[derive(Clone)]
pub struct Announcer {
    store: Arc<dyn EntityStore>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Announcer {
    pub fn new(store: Arc<dyn EntityStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Never fails: lookup problems only cost the email
    pub async fn announce(&self, event: &Event, user_id: Uuid, kind: NotificationKind, status: Option<RegistrationStatus>) {
        let (title, message) = render(kind, event, status);
        self.dispatcher
            .notify(user_id, kind, title.clone(), message.clone(), Some(event.id));

        match self.store.find_user(user_id).await {
            Ok(Some(user)) => {
                let subject = format!("{}: {}", title, event.title);
                self.dispatcher.send_email(&user.email, subject, message);
            }
            Ok(None) => warn!(user_id = %user_id, "No user record, email skipped"),
            Err(e) => log_dispatch_failure("email", &user_id.to_string(), &e),
        }
    }
}
