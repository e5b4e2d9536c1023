/// Activity log persistence
///
/// Rows are only ever appended. `entity_id` is NULL for collection-level
/// actions such as "Viewed list".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivityLogEntry {
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub user_id: Uuid,
}

impl ActivityLogEntry {
    pub async fn append(pool: &PgPool, entry: NewActivityLogEntry) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            INSERT INTO activity_logs (entity_type, entity_id, action, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, entity_type, entity_id, action, user_id, timestamp
            "#,
        )
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.action)
        .bind(entry.user_id)
        .fetch_one(pool)
        .await
    }

    /// Entries for one entity, oldest first
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            SELECT id, entity_type, entity_id, action, user_id, timestamp
            FROM activity_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }

    /// Most recent entries by one identity
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            SELECT id, entity_type, entity_id, action, user_id, timestamp
            FROM activity_logs
            WHERE user_id = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
