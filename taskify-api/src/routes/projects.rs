/// Project endpoints
///
/// Non-admins see and manage only the projects they own. Reading a
/// project the caller cannot see is a 404; modifying one is a 403.

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    routes::not_blank,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{
        authorization::{authorize, authorize_delete, DeleteTarget, Operation, Scope},
        middleware::AuthContext,
    },
    models::{
        project::{CreateProject, Project, UpdateProject},
        EntityKind,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Fields absent from the body are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

impl CreateProjectRequest {
    fn into_new(self, owner_id: Uuid) -> Result<CreateProject, ApiError> {
        self.validate()?;

        Ok(CreateProject {
            name: self.name.trim().to_string(),
            description: self.description.unwrap_or_default(),
            owner_id,
        })
    }
}

impl UpdateProjectRequest {
    fn into_changes(self) -> Result<UpdateProject, ApiError> {
        self.validate()?;
        if self.name.is_none() && self.description.is_none() {
            return Err(ApiError::BadRequest("No fields to update".to_string()));
        }

        Ok(UpdateProject {
            name: self.name.map(|name| name.trim().to_string()),
            description: self.description,
        })
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Audited<Json<Vec<ProjectView>>>> {
    let projects = Project::list(&state.db, Scope::for_caller(&caller).user_filter()).await?;

    Ok(Audited::new(
        AuditEntry::collection(EntityKind::Project, actions::VIEWED_LIST),
        Json(projects.into_iter().map(ProjectView::from).collect()),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<Json<ProjectView>>> {
    let project = find_project(&state, id).await?;
    authorize(&caller, Operation::Read, &project)?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Project, id, actions::VIEWED),
        Json(project.into()),
    ))
}

/// Create a project owned by the caller
pub async fn create_project(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> ApiResult<Audited<(StatusCode, Json<ProjectView>)>> {
    let data = req.into_new(caller.user_id)?;
    let project = Project::create(&state.db, data).await?;

    tracing::info!(project_id = %project.id, owner_id = %project.owner_id, "Project created");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Project, project.id, actions::CREATE),
        (StatusCode::CREATED, Json(project.into())),
    ))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> ApiResult<Audited<StatusCode>> {
    let changes = req.into_changes()?;

    let project = find_project(&state, id).await?;
    authorize(&caller, Operation::Update, &project)?;

    Project::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Project, id, actions::UPDATE),
        StatusCode::NO_CONTENT,
    ))
}

/// Delete a project; its tasks are kept and lose their project
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<StatusCode>> {
    let project = find_project(&state, id).await?;
    authorize_delete(&caller, DeleteTarget::Project(&project))?;

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %id, deleted_by = %caller.user_id, "Project deleted");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Project, id, actions::DELETE),
        StatusCode::NO_CONTENT,
    ))
}

async fn find_project(state: &AppState, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}
