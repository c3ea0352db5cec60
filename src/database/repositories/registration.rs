//! Registration repository implementation
//!
//! Admission and status changes run in transactions that lock the parent
//! event row, which serialises capacity decisions and attendee counter
//! changes per event.

use sqlx::{FromRow, PgPool, Postgres, Transaction};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::registration::{
    CapacityLimit, Registration, RegistrationStatus, RegistrationWrite, StatusChange, TransitionOutcome,
};
use crate::utils::errors::EventHubError;

const REGISTRATION_COLUMNS: &str = "id, event_id, user_id, status, payment_status, attendance_status, registration_date, ticket_type, notes, updated_at";

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    status: String,
    payment_status: String,
    attendance_status: bool,
    registration_date: DateTime<Utc>,
    ticket_type: String,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = EventHubError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Registration {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            status: row.status.parse()?,
            payment_status: row.payment_status.parse()?,
            attendance_status: row.attendance_status,
            registration_date: row.registration_date,
            ticket_type: row.ticket_type,
            notes: row.notes,
            updated_at: row.updated_at,
        })
    }
}

fn status_names(statuses: &[RegistrationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Translate the (event_id, user_id) unique index violation into `Duplicate`
fn map_insert_error(error: sqlx::Error, event_id: Uuid, user_id: Uuid) -> EventHubError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return EventHubError::Duplicate { event_id, user_id };
        }
    }
    EventHubError::Database(error)
}

#[derive(Clone, Debug)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: Uuid) -> Result<bool, EventHubError> {
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(locked.is_some())
    }

    /// `attendees_count += delta`, clamped at 0, under the caller's event lock
    async fn adjust_attendees(tx: &mut Transaction<'_, Postgres>, event_id: Uuid, delta: i32) -> Result<i32, EventHubError> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE events
            SET attendees_count = GREATEST(attendees_count + $2, 0)
            WHERE id = $1
            RETURNING attendees_count
            "#
        )
        .bind(event_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count)
    }

    async fn ensure_capacity(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        limit: &CapacityLimit,
        excluding: Option<Uuid>,
    ) -> Result<(), EventHubError> {
        let occupied: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM registrations
            WHERE event_id = $1 AND status = ANY($2) AND ($3::UUID IS NULL OR id <> $3)
            "#
        )
        .bind(event_id)
        .bind(status_names(limit.rule.statuses()))
        .bind(excluding)
        .fetch_one(&mut **tx)
        .await?;

        if limit.admits(occupied) {
            Ok(())
        } else {
            Err(EventHubError::Capacity { event_id, capacity: limit.capacity, occupied })
        }
    }

    /// Insert a registration and count it under the event row lock
    pub async fn create(&self, registration: &Registration, limit: Option<CapacityLimit>) -> Result<RegistrationWrite, EventHubError> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_event(&mut tx, registration.event_id).await? {
            tx.rollback().await?;
            return Err(EventHubError::event_not_found(registration.event_id));
        }

        if let Some(limit) = limit {
            if let Err(e) = Self::ensure_capacity(&mut tx, registration.event_id, &limit, None).await {
                tx.rollback().await?;
                return Err(e);
            }
        }

        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            INSERT INTO registrations ({REGISTRATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(registration.user_id)
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(registration.attendance_status)
        .bind(registration.registration_date)
        .bind(&registration.ticket_type)
        .bind(&registration.notes)
        .bind(registration.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, registration.event_id, registration.user_id))?;

        let delta = i32::from(registration.status.counts_as_attendee());
        let attendees_count = Self::adjust_attendees(&mut tx, registration.event_id, delta).await?;

        tx.commit().await?;
        Ok(RegistrationWrite { registration: row.try_into()?, attendees_count })
    }

    /// Find registration by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, EventHubError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    /// Find the registration of a user for an event
    pub async fn find_for(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<Registration>, EventHubError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND user_id = $2"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    /// Get event registrations, oldest first
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>, EventHubError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY registration_date ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Registration::try_from).collect()
    }

    /// Count registrations of an event in the given statuses
    pub async fn count(&self, event_id: Uuid, statuses: &[RegistrationStatus]) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = ANY($2)"
        )
        .bind(event_id)
        .bind(status_names(statuses))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Compare-and-set status update
    pub async fn transition(&self, change: &StatusChange) -> Result<TransitionOutcome, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(change.registration_id)
        .fetch_optional(&mut *tx)
        .await?;
        let current: Registration = match current {
            Some(row) => row.try_into()?,
            None => {
                tx.rollback().await?;
                return Ok(TransitionOutcome::NotFound);
            }
        };

        // Event lock first, matching the admission path's lock order
        if !Self::lock_event(&mut tx, current.event_id).await? {
            tx.rollback().await?;
            return Err(EventHubError::event_not_found(current.event_id));
        }

        let entering_slot = !change.expected.occupies_slot() && change.status.occupies_slot();
        if let (true, Some(limit)) = (entering_slot, change.capacity) {
            if let Err(e) = Self::ensure_capacity(&mut tx, current.event_id, &limit, Some(current.id)).await {
                tx.rollback().await?;
                return Err(e);
            }
        }

        let updated = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            UPDATE registrations
            SET status = $3,
                payment_status = $4,
                attendance_status = CASE WHEN $3 = 'confirmed' THEN attendance_status ELSE FALSE END,
                updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(change.registration_id)
        .bind(change.expected.as_str())
        .bind(change.status.as_str())
        .bind(change.payment_status.as_str())
        .bind(change.at)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(row) => {
                let delta = change.expected.attendee_delta(change.status);
                let attendees_count = Self::adjust_attendees(&mut tx, current.event_id, delta).await?;
                tx.commit().await?;
                Ok(TransitionOutcome::Applied(RegistrationWrite { registration: row.try_into()?, attendees_count }))
            }
            None => {
                let latest = sqlx::query_as::<_, RegistrationRow>(&format!(
                    "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
                ))
                .bind(change.registration_id)
                .fetch_optional(&mut *tx)
                .await?;
                tx.rollback().await?;

                match latest {
                    Some(row) => Ok(TransitionOutcome::Conflict(row.try_into()?)),
                    None => Ok(TransitionOutcome::NotFound),
                }
            }
        }
    }

    /// Set attendance on a confirmed registration
    pub async fn set_attendance(&self, id: Uuid, attended: bool, at: DateTime<Utc>) -> Result<Option<Registration>, EventHubError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            UPDATE registrations
            SET attendance_status = $2, updated_at = $3
            WHERE id = $1 AND status = 'confirmed'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(attended)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }
}
