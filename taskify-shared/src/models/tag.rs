/// Tag model, task/tag links and tag-set diffing
///
/// Tag names are unique regardless of case (`tags_name_key`). A tag cannot
/// be deleted while a task references it; `task_tags.tag_id` is RESTRICT so
/// the database enforces the same rule.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Difference between a task's current and desired tag sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes which links to insert and which to delete
///
/// Duplicates in `desired` are ignored. Output is sorted.
pub fn diff_tag_sets(current: &[Uuid], desired: &[Uuid]) -> TagDiff {
    let current: BTreeSet<Uuid> = current.iter().copied().collect();
    let desired: BTreeSet<Uuid> = desired.iter().copied().collect();

    TagDiff {
        added: desired.difference(&current).copied().collect(),
        removed: current.difference(&desired).copied().collect(),
    }
}

impl Tag {
    pub async fn create(pool: &PgPool, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
            .bind(name.trim())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    /// Returns the subset of `ids` that exist
    pub async fn existing_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Number of tasks linked to the tag
    pub async fn usage_count(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_tags WHERE tag_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tags linked to one task, ordered by name
    pub async fn for_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN task_tags tt ON tt.tag_id = t.id
            WHERE tt.task_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    /// Tags for many tasks at once, keyed by task ID
    pub async fn for_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Self>>, sqlx::Error> {
        let rows: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT tt.task_id, t.id, t.name
            FROM task_tags tt
            JOIN tags t ON t.id = tt.tag_id
            WHERE tt.task_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        let mut by_task: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (task_id, id, name) in rows {
            by_task.entry(task_id).or_default().push(Tag { id, name });
        }

        Ok(by_task)
    }

    /// Applies a tag diff to one task inside the caller's transaction
    pub async fn apply_diff(
        conn: &mut PgConnection,
        task_id: Uuid,
        diff: &TagDiff,
    ) -> Result<(), sqlx::Error> {
        if !diff.removed.is_empty() {
            sqlx::query("DELETE FROM task_tags WHERE task_id = $1 AND tag_id = ANY($2)")
                .bind(task_id)
                .bind(&diff.removed[..])
                .execute(&mut *conn)
                .await?;
        }

        if !diff.added.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO task_tags (task_id, tag_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(task_id)
            .bind(&diff.added[..])
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
