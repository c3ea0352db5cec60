//! Event repository implementation

use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::database::store::{EventRemoval, Recount};
use crate::models::event::{Event, EventStatus, SavedEvent};
use crate::utils::errors::EventHubError;

const EVENT_COLUMNS: &str = "id, organizer_id, title, capacity, is_published, is_paid, price_cents, start_date, end_date, status, attendees_count, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    capacity: i32,
    is_published: bool,
    is_paid: bool,
    price_cents: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    attendees_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = EventHubError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            title: row.title,
            capacity: row.capacity,
            is_published: row.is_published,
            is_paid: row.is_paid,
            price_cents: row.price_cents,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status.parse()?,
            attendees_count: row.attendees_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SavedEventRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<SavedEventRow> for SavedEvent {
    fn from(row: SavedEventRow) -> Self {
        SavedEvent {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, event: &Event) -> Result<Event, EventHubError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, organizer_id, title, capacity, is_published, is_paid, price_cents, start_date, end_date, status, attendees_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(event.capacity)
        .bind(event.is_published)
        .bind(event.is_paid)
        .bind(event.price_cents)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.status.as_str())
        .bind(event.attendees_count)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, EventHubError> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    /// List all event ids, soonest first
    pub async fn list_ids(&self) -> Result<Vec<Uuid>, EventHubError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM events ORDER BY start_date ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Update event status
    pub async fn set_status(&self, id: Uuid, status: EventStatus, at: DateTime<Utc>) -> Result<Option<Event>, EventHubError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    /// Delete event together with its bookmarks when no registration references it
    pub async fn delete_if_unregistered(&self, id: Uuid) -> Result<EventRemoval, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(EventRemoval::NotFound);
        }

        let registrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE event_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if registrations > 0 {
            tx.rollback().await?;
            return Ok(EventRemoval::HasRegistrations { registrations });
        }

        let saved = sqlx::query("DELETE FROM saved_events WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(EventRemoval::Removed { saved_events_removed: saved.rows_affected() })
    }

    /// Atomically add `delta` to the attendee counter, never going below zero
    pub async fn increment_attendees(&self, id: Uuid, delta: i32) -> Result<Option<i32>, EventHubError> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE events
            SET attendees_count = GREATEST(attendees_count + $2, 0)
            WHERE id = $1
            RETURNING attendees_count
            "#
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    /// Rewrite the attendee counter from the confirmed registrations
    pub async fn recount_attendees(&self, id: Uuid) -> Result<Option<Recount>, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, i32>("SELECT attendees_count FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Counted in a new statement after the lock, so registration writes
        // committed by the previous lock holder are visible.
        let recomputed = sqlx::query_scalar::<_, i32>(
            "SELECT COUNT(*)::INTEGER FROM registrations WHERE event_id = $1 AND status = 'confirmed'"
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE events SET attendees_count = $2 WHERE id = $1")
            .bind(id)
            .bind(recomputed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Recount { event_id: id, previous, recomputed }))
    }

    /// Bookmark an event for a user
    pub async fn save_for_user(&self, saved: &SavedEvent) -> Result<SavedEvent, EventHubError> {
        let row = sqlx::query_as::<_, SavedEventRow>(
            r#"
            INSERT INTO saved_events (id, event_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, user_id) DO UPDATE SET event_id = EXCLUDED.event_id
            RETURNING id, event_id, user_id, created_at
            "#
        )
        .bind(saved.id)
        .bind(saved.event_id)
        .bind(saved.user_id)
        .bind(saved.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Count bookmarks of an event
    pub async fn count_saved(&self, event_id: Uuid) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM saved_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
