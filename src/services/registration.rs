//! Registration service implementation
//!
//! Owns the registration lifecycle: admission, payment confirmation,
//! cancellation, staff status updates, attendance and manual attendees.
//! Every status change is a compare-and-set against the store that moves
//! the attendee counter in the same step; the dispatcher is told afterwards.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::config::settings::RegistrationConfig;
use crate::database::{EntityStore, Recount};
use crate::models::{
    Actor, CheckInStatus, Event, ManualAttendeeRequest, NotificationKind, OccupancyRule,
    PaymentStatus, RegisterRequest, Registration, RegistrationStatus, StatusChange,
    TransitionOutcome, User,
};
use crate::services::capacity::{CapacityCheck, CapacityGuard};
use crate::services::counter::AttendeeCounter;
use crate::services::notification::{Announcer, Dispatcher};
use crate::utils::clock::Clock;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::{log_admin_action, log_registration_action};

/// Compare-and-set retries before giving up on a contended registration
const MAX_TRANSITION_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    guard: CapacityGuard,
    counter: AttendeeCounter,
    announcer: Announcer,
    config: RegistrationConfig,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            guard: CapacityGuard::new(store.clone(), clock.clone()),
            counter: AttendeeCounter::new(store.clone()),
            announcer: Announcer::new(store.clone(), dispatcher),
            store,
            clock,
            config,
        }
    }

    pub fn counter(&self) -> &AttendeeCounter {
        &self.counter
    }

    /// Occupancy of an event as seen by self-service registration
    pub async fn check_capacity(&self, event_id: Uuid) -> Result<CapacityCheck> {
        self.guard.check_capacity(event_id).await
    }

    /// Register `user_id` for an event.
    ///
    /// Free events confirm immediately, paid events start pending until
    /// [`confirm_payment`](Self::confirm_payment). A previously cancelled
    /// registration for the same pair is reactivated in place.
    pub async fn register_for_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        actor: &Actor,
        request: RegisterRequest,
    ) -> Result<Registration> {
        actor.ensure_self_or_admin(user_id)?;
        self.load_user(user_id).await?;
        let event = self.guard.load_open_event(event_id).await?;

        let existing = self.store.find_registration_for(event_id, user_id).await?;
        if let Some(existing) = &existing {
            if existing.status.occupies_slot() {
                return Err(EventHubError::Duplicate { event_id, user_id });
            }
        }

        let check = self.guard.evaluate(&event, OccupancyRule::ReservePending).await?;
        if !check.allowed {
            return Err(check.into_error());
        }

        let status = if event.is_paid {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::Confirmed
        };
        let limit = CapacityGuard::limit(&event, OccupancyRule::ReservePending);
        let payment_status = PaymentStatus::initial(event.is_paid);
        Self::ensure_payment_fits(&event, payment_status)?;

        let (write, previous) = match existing {
            Some(cancelled) => {
                let change = StatusChange {
                    registration_id: cancelled.id,
                    expected: RegistrationStatus::Cancelled,
                    status,
                    payment_status,
                    capacity: limit,
                    at: self.clock.now(),
                };
                match self.store.transition_registration(change).await? {
                    TransitionOutcome::Applied(write) => (write, Some(RegistrationStatus::Cancelled)),
                    // someone reactivated it first
                    TransitionOutcome::Conflict(_) => return Err(EventHubError::Duplicate { event_id, user_id }),
                    TransitionOutcome::NotFound => return Err(EventHubError::registration_not_found(cancelled.id)),
                }
            }
            None => {
                let now = self.clock.now();
                let registration = Registration {
                    id: Uuid::new_v4(),
                    event_id,
                    user_id,
                    status,
                    payment_status,
                    attendance_status: false,
                    registration_date: now,
                    ticket_type: request
                        .ticket_type
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| self.config.default_ticket_type.clone()),
                    notes: request.notes,
                    updated_at: now,
                };
                (self.store.insert_registration(registration, limit).await?, None)
            }
        };

        self.counter.record_transition(previous, &write);
        let registration = write.registration;
        log_registration_action(registration.id, event_id, user_id, "register", registration.status.as_str());

        let kind = match registration.status {
            RegistrationStatus::Confirmed => NotificationKind::RegistrationConfirmed,
            _ => NotificationKind::RegistrationPending,
        };
        self.announcer.announce(&event, user_id, kind, Some(registration.status)).await;

        Ok(registration)
    }

    /// Mark the payment of a paid registration as completed and confirm it
    pub async fn confirm_payment(&self, registration_id: Uuid, actor: &Actor) -> Result<Registration> {
        let mut registration = self.load_registration(registration_id).await?;
        let event = self.load_event(registration.event_id).await?;

        if actor.id != registration.user_id && !actor.manages(&event) {
            return Err(EventHubError::Unauthorized(format!(
                "{} {} cannot confirm payment for registration {}",
                actor.role, actor.id, registration_id
            )));
        }
        if !event.is_paid {
            return Err(EventHubError::InvalidState(format!("event {} is free, there is no payment to confirm", event.id)));
        }

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            match (registration.status, registration.payment_status) {
                (RegistrationStatus::Cancelled, _) => {
                    return Err(EventHubError::InvalidState("cannot confirm payment for a cancelled registration".to_string()));
                }
                (RegistrationStatus::Confirmed, PaymentStatus::Completed) => {
                    debug!(registration_id = %registration_id, "Payment already confirmed");
                    return Ok(registration);
                }
                _ => {}
            }
            Self::ensure_payment_fits(&event, PaymentStatus::Completed)?;

            let change = StatusChange {
                registration_id,
                expected: registration.status,
                status: RegistrationStatus::Confirmed,
                payment_status: PaymentStatus::Completed,
                capacity: None,
                at: self.clock.now(),
            };

            match self.store.transition_registration(change).await? {
                TransitionOutcome::Applied(write) => {
                    self.counter.record_transition(Some(registration.status), &write);
                    let updated = write.registration;
                    log_registration_action(updated.id, event.id, updated.user_id, "confirm_payment", updated.status.as_str());
                    if registration.status != RegistrationStatus::Confirmed {
                        self.announcer
                            .announce(&event, updated.user_id, NotificationKind::RegistrationConfirmed, Some(updated.status))
                            .await;
                    }
                    return Ok(updated);
                }
                TransitionOutcome::Conflict(current) => registration = current,
                TransitionOutcome::NotFound => return Err(EventHubError::registration_not_found(registration_id)),
            }
        }

        Err(Self::contended(registration_id))
    }

    /// Cancel the registration of `user_id` for an event.
    ///
    /// The registrant may only cancel until `cancellation_window_hours`
    /// before the event starts; staff managing the event may cancel at any
    /// time. Cancelling an already cancelled registration succeeds without
    /// effect.
    pub async fn cancel_registration(&self, event_id: Uuid, user_id: Uuid, actor: &Actor) -> Result<Registration> {
        let event = self.load_event(event_id).await?;
        let staff = actor.manages(&event);
        if !staff && actor.id != user_id {
            return Err(EventHubError::Unauthorized(format!(
                "{} {} cannot cancel the registration of user {}",
                actor.role, actor.id, user_id
            )));
        }

        let mut registration = self
            .store
            .find_registration_for(event_id, user_id)
            .await?
            .ok_or_else(|| EventHubError::registration_not_found(format!("event {} / user {}", event_id, user_id)))?;

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            if registration.status == RegistrationStatus::Cancelled {
                debug!(registration_id = %registration.id, "Registration already cancelled");
                return Ok(registration);
            }

            let now = self.clock.now();
            if !staff {
                let window = Duration::hours(self.config.cancellation_window_hours);
                if now >= event.start_date - window {
                    return Err(EventHubError::WindowClosed {
                        event_id,
                        window_hours: self.config.cancellation_window_hours,
                    });
                }
            }

            let payment_status = registration.payment_status.after_cancellation();
            Self::ensure_payment_fits(&event, payment_status)?;
            let change = StatusChange {
                registration_id: registration.id,
                expected: registration.status,
                status: RegistrationStatus::Cancelled,
                payment_status,
                capacity: None,
                at: now,
            };

            match self.store.transition_registration(change).await? {
                TransitionOutcome::Applied(write) => {
                    self.counter.record_transition(Some(registration.status), &write);
                    let updated = write.registration;
                    log_registration_action(updated.id, event_id, user_id, "cancel", updated.status.as_str());
                    if staff && actor.id != user_id {
                        log_admin_action(actor.id, "cancel_registration", Some(updated.id.to_string().as_str()), None);
                    }
                    self.announcer
                        .announce(&event, user_id, NotificationKind::RegistrationCancelled, Some(updated.status))
                        .await;
                    return Ok(updated);
                }
                TransitionOutcome::Conflict(current) => registration = current,
                TransitionOutcome::NotFound => return Err(EventHubError::registration_not_found(registration.id)),
            }
        }

        Err(Self::contended(registration.id))
    }

    /// Record physical attendance on a confirmed registration
    pub async fn mark_attendance(&self, registration_id: Uuid, attended: bool, actor: &Actor) -> Result<Registration> {
        let registration = self.load_registration(registration_id).await?;
        let event = self.load_event(registration.event_id).await?;
        actor.ensure_manages(&event)?;

        if registration.status != RegistrationStatus::Confirmed {
            return Err(Self::not_confirmed(&registration));
        }

        match self.store.set_attendance(registration_id, attended, self.clock.now()).await? {
            Some(updated) => {
                log_registration_action(
                    updated.id,
                    updated.event_id,
                    updated.user_id,
                    if attended { "check_in" } else { "undo_check_in" },
                    updated.status.as_str(),
                );
                Ok(updated)
            }
            // status moved between the read and the write
            None => match self.store.find_registration(registration_id).await? {
                Some(current) => Err(Self::not_confirmed(&current)),
                None => Err(EventHubError::registration_not_found(registration_id)),
            },
        }
    }

    /// Organizer check-in: checked-in marks attendance, not-checked-in
    /// clears it, cancelled cancels the registration.
    pub async fn check_in(
        &self,
        event_id: Uuid,
        registration_id: Uuid,
        status: CheckInStatus,
        actor: &Actor,
    ) -> Result<Registration> {
        let registration = self.load_registration(registration_id).await?;
        if registration.event_id != event_id {
            return Err(EventHubError::registration_not_found(registration_id));
        }

        match status {
            CheckInStatus::CheckedIn => self.mark_attendance(registration_id, true, actor).await,
            CheckInStatus::NotCheckedIn => self.mark_attendance(registration_id, false, actor).await,
            CheckInStatus::Cancelled => {
                self.update_registration_status(registration_id, RegistrationStatus::Cancelled.as_str(), actor)
                    .await
            }
        }
    }

    /// Staff override of a registration's status
    pub async fn update_registration_status(&self, registration_id: Uuid, new_status: &str, actor: &Actor) -> Result<Registration> {
        let status: RegistrationStatus = new_status.parse()?;
        let mut registration = self.load_registration(registration_id).await?;
        let event = self.load_event(registration.event_id).await?;
        actor.ensure_manages(&event)?;

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            if registration.status == status {
                debug!(registration_id = %registration_id, status = %status, "Status unchanged");
                return Ok(registration);
            }

            let reinstating = !registration.status.occupies_slot() && status.occupies_slot();
            let payment_status = Self::payment_after(registration.payment_status, status);
            Self::ensure_payment_fits(&event, payment_status)?;
            let change = StatusChange {
                registration_id,
                expected: registration.status,
                status,
                payment_status,
                capacity: if reinstating {
                    CapacityGuard::limit(&event, OccupancyRule::ReservePending)
                } else {
                    None
                },
                at: self.clock.now(),
            };

            match self.store.transition_registration(change).await? {
                TransitionOutcome::Applied(write) => {
                    self.counter.record_transition(Some(registration.status), &write);
                    let updated = write.registration;
                    let transition = format!("{} -> {}", registration.status, updated.status);
                    log_admin_action(
                        actor.id,
                        "update_registration_status",
                        Some(updated.id.to_string().as_str()),
                        Some(transition.as_str()),
                    );
                    self.announcer
                        .announce(&event, updated.user_id, NotificationKind::RegistrationStatusUpdated, Some(updated.status))
                        .await;
                    return Ok(updated);
                }
                TransitionOutcome::Conflict(current) => registration = current,
                TransitionOutcome::NotFound => return Err(EventHubError::registration_not_found(registration_id)),
            }
        }

        Err(Self::contended(registration_id))
    }

    /// Add a walk-in attendee on an organizer's behalf.
    ///
    /// Reuses the user owning the email or creates a manual one. The
    /// registration is confirmed straight away; only confirmed
    /// registrations count against capacity on this path.
    pub async fn add_attendee_manually(
        &self,
        event_id: Uuid,
        actor: &Actor,
        request: ManualAttendeeRequest,
    ) -> Result<Registration> {
        let request = request.normalized()?;
        let event = self.load_event(event_id).await?;
        actor.ensure_manages(&event)?;
        self.guard.ensure_open(&event)?;

        let check = self.guard.evaluate(&event, OccupancyRule::ConfirmedOnly).await?;
        if !check.allowed {
            return Err(check.into_error());
        }

        let now = self.clock.now();
        let (user, created) = self
            .store
            .find_or_create_user(User {
                id: Uuid::new_v4(),
                name: request.name.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                is_manual: true,
                created_at: now,
            })
            .await?;
        if created {
            info!(user_id = %user.id, email = %user.email, "Manual attendee account created");
        }

        if self.store.find_registration_for(event_id, user.id).await?.is_some() {
            return Err(EventHubError::Duplicate { event_id, user_id: user.id });
        }

        let payment_status = if event.is_paid {
            PaymentStatus::Completed
        } else {
            PaymentStatus::NotApplicable
        };
        Self::ensure_payment_fits(&event, payment_status)?;

        let registration = Registration {
            id: Uuid::new_v4(),
            event_id,
            user_id: user.id,
            status: RegistrationStatus::Confirmed,
            payment_status,
            attendance_status: false,
            registration_date: now,
            ticket_type: request
                .ticket_type
                .unwrap_or_else(|| self.config.default_ticket_type.clone()),
            notes: None,
            updated_at: now,
        };
        let write = self
            .store
            .insert_registration(registration, CapacityGuard::limit(&event, OccupancyRule::ConfirmedOnly))
            .await?;

        self.counter.record_transition(None, &write);
        let registration = write.registration;
        log_admin_action(actor.id, "add_attendee", Some(registration.id.to_string().as_str()), Some(user.email.as_str()));
        self.announcer
            .announce(&event, user.id, NotificationKind::RegistrationConfirmed, Some(registration.status))
            .await;

        Ok(registration)
    }

    /// Fetch one registration; visible to the registrant and event staff
    pub async fn get_registration(&self, registration_id: Uuid, actor: &Actor) -> Result<Registration> {
        let registration = self.load_registration(registration_id).await?;
        if actor.id != registration.user_id {
            let event = self.load_event(registration.event_id).await?;
            actor.ensure_manages(&event)?;
        }
        Ok(registration)
    }

    /// All registrations of an event, oldest first
    pub async fn list_event_registrations(&self, event_id: Uuid, actor: &Actor) -> Result<Vec<Registration>> {
        let event = self.load_event(event_id).await?;
        actor.ensure_manages(&event)?;
        self.store.list_registrations(event_id).await
    }

    /// Staff-triggered repair of the attendee counter
    pub async fn recount_attendees(&self, event_id: Uuid, actor: &Actor) -> Result<Recount> {
        let event = self.load_event(event_id).await?;
        actor.ensure_manages(&event)?;
        let recount = self.counter.recompute_attendees_count(event_id).await?;
        log_admin_action(actor.id, "recount_attendees", Some(event_id.to_string().as_str()), None);
        Ok(recount)
    }

    /// Payment status that goes with moving into `next`
    fn payment_after(current: PaymentStatus, next: RegistrationStatus) -> PaymentStatus {
        match (next, current) {
            (RegistrationStatus::Cancelled, payment) => payment.after_cancellation(),
            // a refunded registration owes payment again once reinstated
            (_, PaymentStatus::Refunded) => PaymentStatus::Pending,
            (_, payment) => payment,
        }
    }

    /// Payment status must be `not_applicable` exactly when the event is free
    fn ensure_payment_fits(event: &Event, payment_status: PaymentStatus) -> Result<()> {
        if payment_status.is_consistent_with(event.is_paid) {
            return Ok(());
        }
        Err(EventHubError::InvalidState(format!(
            "payment status {} does not fit {} event {}",
            payment_status,
            if event.is_paid { "paid" } else { "free" },
            event.id
        )))
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| EventHubError::user_not_found(user_id))
    }

    async fn load_registration(&self, registration_id: Uuid) -> Result<Registration> {
        self.store
            .find_registration(registration_id)
            .await?
            .ok_or_else(|| EventHubError::registration_not_found(registration_id))
    }

    fn not_confirmed(registration: &Registration) -> EventHubError {
        EventHubError::InvalidState(format!(
            "attendance requires a confirmed registration, registration {} is {}",
            registration.id, registration.status
        ))
    }

    fn contended(registration_id: Uuid) -> EventHubError {
        warn!(registration_id = %registration_id, "Registration kept changing under concurrent updates");
        EventHubError::InvalidState(format!("registration {} was modified concurrently, retry", registration_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_after_transition() {
        use PaymentStatus::*;
        assert_eq!(RegistrationService::payment_after(Completed, RegistrationStatus::Cancelled), Refunded);
        assert_eq!(RegistrationService::payment_after(Pending, RegistrationStatus::Cancelled), Pending);
        assert_eq!(RegistrationService::payment_after(Refunded, RegistrationStatus::Pending), Pending);
        assert_eq!(RegistrationService::payment_after(NotApplicable, RegistrationStatus::Confirmed), NotApplicable);
    }

    #[test]
    fn test_payment_must_fit_event() {
        let now = chrono::Utc::now();
        let mut event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Lindy Exchange".to_string(),
            capacity: 0,
            is_published: true,
            is_paid: false,
            price_cents: 0,
            start_date: now,
            end_date: now,
            status: crate::models::EventStatus::Active,
            attendees_count: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(RegistrationService::ensure_payment_fits(&event, PaymentStatus::NotApplicable).is_ok());
        assert!(matches!(
            RegistrationService::ensure_payment_fits(&event, PaymentStatus::Completed),
            Err(EventHubError::InvalidState(_))
        ));

        event.is_paid = true;
        assert!(RegistrationService::ensure_payment_fits(&event, PaymentStatus::Refunded).is_ok());
        assert!(RegistrationService::ensure_payment_fits(&event, PaymentStatus::NotApplicable).is_err());
    }
}
