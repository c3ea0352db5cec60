//! Concurrent admission tests
//!
//! Uniqueness and capacity must hold when many registrations for the same
//! event race each other.

mod helpers;

use futures::future::join_all;
use helpers::*;
use uuid::Uuid;
use EventHub::database::EntityStore;
use EventHub::models::{Actor, RegisterRequest, RegistrationStatus};
use EventHub::EventHubError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_pair_registers_once() {
    let ctx = TestContext::new();
    let event = ctx.seed_event(EventFixture::new(Uuid::new_v4())).await;
    let (a, actor) = ctx.seed_attendee("Lennart Westerlund").await;
    let (event_id, user_id) = (event.id, a.id);

    let attempts = (0..2).map(|_| {
        let service = ctx.services.registration_service.clone();
        tokio::spawn(async move {
            service
                .register_for_event(event_id, user_id, &actor, RegisterRequest::default())
                .await
        })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(EventHubError::Duplicate { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(ctx.store.list_registrations(event.id).await.unwrap().len(), 1);
    assert_eq!(ctx.attendees_count(event.id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_holds_under_contention() {
    const CAPACITY: usize = 5;

    let ctx = TestContext::new();
    let event = ctx.seed_event(EventFixture::new(Uuid::new_v4()).capacity(CAPACITY as i32)).await;

    let mut attendees = Vec::new();
    for i in 0..=CAPACITY {
        attendees.push(ctx.seed_attendee(&format!("Dancer {}", i)).await);
    }

    let event_id = event.id;
    let attempts = attendees.into_iter().map(|(user, actor)| {
        let service = ctx.services.registration_service.clone();
        tokio::spawn(async move {
            service
                .register_for_event(event_id, user.id, &actor, RegisterRequest::default())
                .await
        })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(EventHubError::Capacity { .. })))
        .count();
    assert_eq!(successes, CAPACITY);
    assert_eq!(rejected, 1);

    let occupied = ctx
        .store
        .count_registrations(event.id, &[RegistrationStatus::Pending, RegistrationStatus::Confirmed])
        .await
        .unwrap();
    assert_eq!(occupied, CAPACITY as i64);
    assert_eq!(ctx.attendees_count(event.id).await, CAPACITY as i32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancels_decrement_once() {
    let ctx = TestContext::new();
    let organizer = Actor::organizer(Uuid::new_v4());
    let event = ctx.seed_event(EventFixture::new(organizer.id)).await;
    let (a, actor) = ctx.seed_attendee("Marie N'Diaye").await;
    let (b, actor_b) = ctx.seed_attendee("Thomas Blacharz").await;
    let service = &ctx.services.registration_service;

    service
        .register_for_event(event.id, a.id, &actor, RegisterRequest::default())
        .await
        .unwrap();
    service
        .register_for_event(event.id, b.id, &actor_b, RegisterRequest::default())
        .await
        .unwrap();

    let (event_id, user_id) = (event.id, a.id);
    let cancels = [actor, organizer, actor, organizer].into_iter().map(|who| {
        let service = ctx.services.registration_service.clone();
        tokio::spawn(async move { service.cancel_registration(event_id, user_id, &who).await })
    });
    for result in join_all(cancels).await {
        assert_eq!(result.unwrap().unwrap().status, RegistrationStatus::Cancelled);
    }

    assert_eq!(ctx.attendees_count(event.id).await, 1);
}
