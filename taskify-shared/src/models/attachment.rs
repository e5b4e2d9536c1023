/// Attachment metadata
///
/// Only the file name and a storage path are recorded; file contents live
/// outside the database. Attachments are removed with their task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub file_name: String,
    pub file_path: String,
}

impl Attachment {
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (task_id, file_name, file_path)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, file_name, file_path, uploaded_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.file_name.trim())
        .bind(data.file_path.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, file_name, file_path, uploaded_at
            FROM attachments
            WHERE task_id = $1
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
