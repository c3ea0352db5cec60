//! Notification repository implementation

use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::notification::{Notification, NotificationKind};
use crate::utils::errors::EventHubError;

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    message: String,
    related_event_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = EventHubError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = serde_json::from_value(serde_json::Value::String(row.kind))?;
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind,
            title: row.title,
            message: row.message,
            related_event_id: row.related_event_id,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a notification
    pub async fn create(&self, notification: &Notification) -> Result<Notification, EventHubError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, related_event_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_event_id)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification.clone())
    }

    /// Get notifications of a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, EventHubError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, kind, title, message, related_event_id, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }
}
