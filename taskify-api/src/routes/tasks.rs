/// Task endpoints
///
/// A task is visible to its creator, its assignee and admins. Hidden tasks
/// read as 404, while modifying one the caller cannot touch is a 403.
/// Only admins delete tasks.
///
/// - `GET/POST /api/tasks`
/// - `GET/PUT/DELETE /api/tasks/:id`
/// - `POST /api/tasks/:id/tags` - Replace the task's tag set
/// - `GET/POST /api/tasks/:id/attachments`

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::{deserialize_some, AppJson, AppPath},
    routes::not_blank,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{
        authorization::{authorize, authorize_delete, DeleteTarget, Operation, Scope},
        middleware::AuthContext,
    },
    models::{
        attachment::{Attachment, CreateAttachment},
        project::Project,
        tag::{diff_tag_sets, Tag},
        task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
        user::User,
        EntityKind,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by_user_id: Uuid,
    pub assigned_to_user_id: Option<Uuid>,

    /// Ordered by name
    pub tags: Vec<Tag>,
}

impl TaskView {
    fn new(task: Task, tags: Vec<Tag>) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
            created_by_user_id: task.created_by,
            assigned_to_user_id: task.assigned_to,
            tags,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentView {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            task_id: attachment.task_id,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            uploaded_at: attachment.uploaded_at,
        }
    }
}

/// Status and priority parse case-insensitively and default to Todo / Normal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 100, message = "Title must be at most 100 characters")
    )]
    pub title: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_user_id: Option<Uuid>,
}

/// Partial task update
///
/// Absent fields are unchanged; `null` clears the nullable ones.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project_id: Option<Option<Uuid>>,

    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 100, message = "Title must be at most 100 characters")
    )]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_to_user_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTagsRequest {
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddAttachmentRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "File name is required"),
        length(max = 255, message = "File name must be at most 255 characters")
    )]
    pub file_name: String,

    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "File path is required"),
        length(max = 1024, message = "File path must be at most 1024 characters")
    )]
    pub file_path: String,
}

impl CreateTaskRequest {
    fn into_new(self, created_by: Uuid) -> Result<CreateTask, ApiError> {
        self.validate()?;

        Ok(CreateTask {
            project_id: self.project_id,
            title: self.title.trim().to_string(),
            description: self.description,
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            created_by,
            assigned_to: self.assigned_to_user_id,
        })
    }
}

impl UpdateTaskRequest {
    fn into_changes(self) -> Result<UpdateTask, ApiError> {
        self.validate()?;

        let changes = UpdateTask {
            project_id: self.project_id,
            title: self.title.map(|title| title.trim().to_string()),
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            assigned_to: self.assigned_to_user_id,
        };
        if changes == UpdateTask::default() {
            return Err(ApiError::BadRequest("No fields to update".to_string()));
        }

        Ok(changes)
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Audited<Json<Vec<TaskView>>>> {
    let tasks = Task::list(&state.db, Scope::for_caller(&caller).user_filter()).await?;
    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut tags = Tag::for_tasks(&state.db, &ids).await?;

    let views = tasks
        .into_iter()
        .map(|task| {
            let task_tags = tags.remove(&task.id).unwrap_or_default();
            TaskView::new(task, task_tags)
        })
        .collect();

    Ok(Audited::new(
        AuditEntry::collection(EntityKind::Task, actions::VIEWED_LIST),
        Json(views),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<Json<TaskView>>> {
    let task = find_task(&state, id).await?;
    authorize(&caller, Operation::Read, &task)?;
    let tags = Tag::for_task(&state.db, id).await?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Task, id, actions::VIEWED),
        Json(TaskView::new(task, tags)),
    ))
}

/// Create a task owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, a project the caller cannot see,
///   or an unknown assignee
pub async fn create_task(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<Audited<(StatusCode, Json<TaskView>)>> {
    let data = req.into_new(caller.user_id)?;
    if let Some(project_id) = data.project_id {
        ensure_visible_project(&state, &caller, project_id).await?;
    }
    if let Some(assignee) = data.assigned_to {
        ensure_user_exists(&state, assignee).await?;
    }

    let task = Task::create(&state.db, data).await?;

    tracing::info!(task_id = %task.id, created_by = %caller.user_id, "Task created");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Task, task.id, actions::CREATE),
        (StatusCode::CREATED, Json(TaskView::new(task, Vec::new()))),
    ))
}

/// Partially update a task
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields or references, or an empty body
/// - `403 Forbidden`: Caller is neither creator, assignee nor admin
/// - `404 Not Found`: No such task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Audited<StatusCode>> {
    let changes = req.into_changes()?;

    let task = find_task(&state, id).await?;
    if let Some(Some(project_id)) = changes.project_id {
        ensure_visible_project(&state, &caller, project_id).await?;
    }
    if let Some(Some(assignee)) = changes.assigned_to {
        ensure_user_exists(&state, assignee).await?;
    }
    authorize(&caller, Operation::Update, &task)?;

    Task::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Task, id, actions::UPDATE),
        StatusCode::NO_CONTENT,
    ))
}

/// Delete a task (admin only)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<StatusCode>> {
    authorize_delete(&caller, DeleteTarget::Task)?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %id, deleted_by = %caller.user_id, "Task deleted");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Task, id, actions::DELETE),
        StatusCode::NO_CONTENT,
    ))
}

/// Replace a task's tags with exactly `tagIds`
///
/// Duplicate ids are ignored. Links to add and remove are computed from the
/// current set and applied in one transaction.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown tag ids
/// - `403 Forbidden`: Caller may not modify the task
/// - `404 Not Found`: No such task
pub async fn replace_task_tags(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<ReplaceTagsRequest>,
) -> ApiResult<Audited<Json<TaskView>>> {
    let task = find_task(&state, id).await?;

    let desired: BTreeSet<Uuid> = req.tag_ids.iter().copied().collect();
    let desired: Vec<Uuid> = desired.into_iter().collect();

    let mut tx = state.db.begin().await?;

    let existing: BTreeSet<Uuid> = Tag::existing_ids(&mut *tx, &desired)
        .await?
        .into_iter()
        .collect();
    let missing: Vec<String> = desired
        .iter()
        .filter(|tag_id| !existing.contains(tag_id))
        .map(|tag_id| tag_id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::field(
            "tagIds",
            format!("Unknown tag ids: {}", missing.join(", ")),
        ));
    }

    authorize(&caller, Operation::Update, &task)?;

    let current: Vec<Uuid> = Tag::for_task(&mut *tx, id)
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    let diff = diff_tag_sets(&current, &desired);
    Tag::apply_diff(&mut tx, id, &diff).await?;

    let tags = Tag::for_task(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::debug!(
        task_id = %id,
        added = diff.added.len(),
        removed = diff.removed.len(),
        "Task tags replaced"
    );

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Task, id, actions::REPLACE_TAGS),
        Json(TaskView::new(task, tags)),
    ))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Vec<AttachmentView>>> {
    let task = find_task(&state, id).await?;
    authorize(&caller, Operation::Read, &task)?;

    let attachments = Attachment::list_for_task(&state.db, id).await?;

    Ok(Json(attachments.into_iter().map(AttachmentView::from).collect()))
}

/// Record file metadata against a task
pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<AddAttachmentRequest>,
) -> ApiResult<Audited<(StatusCode, Json<AttachmentView>)>> {
    req.validate()?;

    let task = find_task(&state, id).await?;
    authorize(&caller, Operation::Update, &task)?;

    let attachment = Attachment::create(
        &state.db,
        CreateAttachment {
            task_id: id,
            file_name: req.file_name.trim().to_string(),
            file_path: req.file_path.trim().to_string(),
        },
    )
    .await?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Attachment, attachment.id, actions::ADD_ATTACHMENT),
        (StatusCode::CREATED, Json(attachment.into())),
    ))
}

async fn find_task(state: &AppState, id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// A project the caller cannot read is reported exactly like a missing one
async fn ensure_visible_project(
    state: &AppState,
    caller: &AuthContext,
    project_id: Uuid,
) -> ApiResult<()> {
    let visible = match Project::find_by_id(&state.db, project_id).await? {
        Some(project) => authorize(caller, Operation::Read, &project).is_ok(),
        None => false,
    };

    if visible {
        Ok(())
    } else {
        Err(ApiError::field("projectId", "Project not found"))
    }
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> ApiResult<()> {
    match User::find_by_id(&state.db, user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::field("assignedToUserId", "User not found")),
    }
}
