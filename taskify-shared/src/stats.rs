//! Dashboard statistics
//!
//! Counting is done in plain Rust over task snapshots so the rules
//! (completion rate rounding, most-used-tag tie breaking, empty buckets)
//! are testable without a database. The async loaders fetch the caller's
//! scoped tasks and feed them through [`summarize`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::authorization::Scope;
use crate::models::project::Project;
use crate::models::tag::Tag;
use crate::models::task::{Task, TaskPriority, TaskStatus};

/// The parts of a task that statistics look at
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Counts shared by the overview and per-project statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,

    /// Percentage of Done tasks, two decimals
    pub completion_rate: f64,

    pub most_used_tag: Option<String>,

    /// Only statuses with at least one task
    pub tasks_by_status: BTreeMap<String, i64>,

    /// Only priorities with at least one task
    pub tasks_by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    #[serde(flatten)]
    pub tasks: TaskCounts,

    pub total_projects: i64,

    /// Projects with at least one task that isn't Done
    pub active_projects: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_id: uuid::Uuid,
    pub project_name: String,

    #[serde(flatten)]
    pub tasks: TaskCounts,

    pub project_created_at: DateTime<Utc>,
    pub last_task_created: Option<DateTime<Utc>>,
}

/// Percentage of `done` in `total`, rounded to two decimals; 0 for no tasks
pub fn completion_rate(done: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = done as f64 * 100.0 / total as f64;
    (rate * 100.0).round() / 100.0
}

/// Tag linked to the most tasks; ties go to the alphabetically first name
pub fn most_used_tag(tasks: &[TaskSnapshot]) -> Option<String> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for tag in tasks.iter().flat_map(|t| t.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name.to_string())
}

pub fn summarize(tasks: &[TaskSnapshot]) -> TaskCounts {
    let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
    let mut by_priority: BTreeMap<String, i64> = BTreeMap::new();

    for task in tasks {
        *by_status.entry(task.status.as_str().to_string()).or_default() += 1;
        *by_priority.entry(task.priority.as_str().to_string()).or_default() += 1;
    }

    let count = |status: TaskStatus| by_status.get(status.as_str()).copied().unwrap_or(0);
    let total = tasks.len() as i64;
    let completed = count(TaskStatus::Done);
    let pending = count(TaskStatus::Todo);
    let in_progress = count(TaskStatus::InProgress);

    TaskCounts {
        total_tasks: total,
        completed_tasks: completed,
        pending_tasks: pending,
        in_progress_tasks: in_progress,
        completion_rate: completion_rate(completed, total),
        most_used_tag: most_used_tag(tasks),
        tasks_by_status: by_status,
        tasks_by_priority: by_priority,
    }
}

async fn snapshots(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<TaskSnapshot>, sqlx::Error> {
    let ids: Vec<uuid::Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut tags = Tag::for_tasks(pool, &ids).await?;

    Ok(tasks
        .into_iter()
        .map(|task| TaskSnapshot {
            status: task.status,
            priority: task.priority,
            created_at: task.created_at,
            tags: tags
                .remove(&task.id)
                .unwrap_or_default()
                .into_iter()
                .map(|tag| tag.name)
                .collect(),
        })
        .collect())
}

/// Statistics over every task and project visible to the caller
pub async fn overview(pool: &PgPool, scope: Scope) -> Result<OverviewStats, sqlx::Error> {
    let filter = scope.user_filter();

    let tasks = Task::list(pool, filter).await?;
    let counts = summarize(&snapshots(pool, tasks).await?);

    let (total_projects, active_projects): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE EXISTS (
                   SELECT 1 FROM tasks t WHERE t.project_id = p.id AND t.status <> 'Done'
               ))
        FROM projects p
        WHERE ($1::uuid IS NULL OR p.owner_id = $1)
        "#,
    )
    .bind(filter)
    .fetch_one(pool)
    .await?;

    Ok(OverviewStats {
        tasks: counts,
        total_projects,
        active_projects,
    })
}

/// Statistics over one project's tasks within the caller's task scope
///
/// The caller must already be entitled to read `project`.
pub async fn for_project(
    pool: &PgPool,
    scope: Scope,
    project: &Project,
) -> Result<ProjectStats, sqlx::Error> {
    let tasks = Task::list_for_project(pool, project.id, scope.user_filter()).await?;
    let snapshots = snapshots(pool, tasks).await?;
    let last_task_created = snapshots.iter().map(|t| t.created_at).max();

    Ok(ProjectStats {
        project_id: project.id,
        project_name: project.name.clone(),
        tasks: summarize(&snapshots),
        project_created_at: project.created_at,
        last_task_created,
    })
}
