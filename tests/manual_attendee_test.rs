//! Organizer-initiated attendee additions

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use uuid::Uuid;
use EventHub::database::EntityStore;
use EventHub::models::{
    Actor, ManualAttendeeRequest, PaymentStatus, RegisterRequest, RegistrationStatus,
};
use EventHub::EventHubError;

fn walk_in(email: &str) -> ManualAttendeeRequest {
    ManualAttendeeRequest {
        name: "Walk In".to_string(),
        email: email.to_string(),
        phone: Some("+1 555 0100".to_string()),
        ticket_type: Some("door".to_string()),
    }
}

#[tokio::test]
async fn test_creates_manual_user_and_confirms() {
    let ctx = TestContext::new();
    let organizer = Actor::organizer(Uuid::new_v4());
    let event = ctx.seed_event(EventFixture::new(organizer.id)).await;

    let registration = ctx
        .services
        .registration_service
        .add_attendee_manually(event.id, &organizer, walk_in("Walk.In@Example.com"))
        .await
        .unwrap();

    assert_eq!(registration.status, RegistrationStatus::Confirmed);
    assert_eq!(registration.payment_status, PaymentStatus::NotApplicable);
    assert_eq!(registration.ticket_type, "door");
    assert_eq!(ctx.attendees_count(event.id).await, 1);

    let user = ctx.store.find_user_by_email("walk.in@example.com").await.unwrap().unwrap();
    assert!(user.is_manual);
    assert_eq!(registration.user_id, user.id);
}

#[tokio::test]
async fn test_reuses_existing_user_and_rejects_duplicates() {
    let ctx = TestContext::new();
    let organizer = Actor::organizer(Uuid::new_v4());
    let event = ctx.seed_event(EventFixture::new(organizer.id)).await;
    let (existing, actor) = ctx.seed_attendee("Manu Smith").await;
    let service = &ctx.services.registration_service;

    service
        .register_for_event(event.id, existing.id, &actor, RegisterRequest::default())
        .await
        .unwrap();

    assert_matches!(
        service.add_attendee_manually(event.id, &organizer, walk_in(&existing.email)).await,
        Err(EventHubError::Duplicate { user_id, .. }) if user_id == existing.id
    );

    // a cancelled registration still counts as existing on this path
    service.cancel_registration(event.id, existing.id, &actor).await.unwrap();
    assert_matches!(
        service.add_attendee_manually(event.id, &organizer, walk_in(&existing.email)).await,
        Err(EventHubError::Duplicate { .. })
    );
}

#[tokio::test]
async fn test_paid_event_is_comped() {
    let ctx = TestContext::new();
    let organizer = Actor::organizer(Uuid::new_v4());
    let event = ctx.seed_event(EventFixture::new(organizer.id).paid()).await;

    let registration = ctx
        .services
        .registration_service
        .add_attendee_manually(event.id, &organizer, walk_in("guest@example.com"))
        .await
        .unwrap();
    assert_eq!(registration.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_capacity_counts_confirmed_only() {
    let ctx = TestContext::new();
    let organizer = Actor::organizer(Uuid::new_v4());
    let event = ctx.seed_event(EventFixture::new(organizer.id).paid().capacity(2)).await;
    let (a, actor) = ctx.seed_attendee("Peter Strom").await;
    let service = &ctx.services.registration_service;

    // pending reservation does not block the door
    service
        .register_for_event(event.id, a.id, &actor, RegisterRequest::default())
        .await
        .unwrap();
    service
        .add_attendee_manually(event.id, &organizer, walk_in("first@example.com"))
        .await
        .unwrap();
    service
        .add_attendee_manually(event.id, &organizer, walk_in("second@example.com"))
        .await
        .unwrap();

    assert_matches!(
        service.add_attendee_manually(event.id, &organizer, walk_in("third@example.com")).await,
        Err(EventHubError::Capacity { capacity: 2, occupied: 2, .. })
    );
    assert_eq!(ctx.attendees_count(event.id).await, 2);
}

#[tokio::test]
async fn test_requires_event_staff_and_valid_input() {
    let ctx = TestContext::new();
    let event = ctx.seed_event(EventFixture::new(Uuid::new_v4())).await;
    let service = &ctx.services.registration_service;

    assert_matches!(
        service
            .add_attendee_manually(event.id, &Actor::organizer(Uuid::new_v4()), walk_in("x@example.com"))
            .await,
        Err(EventHubError::Unauthorized(_))
    );
    assert_matches!(
        service
            .add_attendee_manually(event.id, &Actor::admin(Uuid::new_v4()), walk_in("not an email"))
            .await,
        Err(EventHubError::Validation(_))
    );
}
