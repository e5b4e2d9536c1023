/// Dashboard statistics endpoints
///
/// Counts cover only the tasks the caller can see (created or assigned,
/// everything for admins).

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::AppPath,
};
use axum::{extract::State, Extension, Json};
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{
        authorization::{authorize, Operation, Scope},
        middleware::AuthContext,
    },
    models::{project::Project, EntityKind},
    stats::{self, OverviewStats, ProjectStats},
};
use uuid::Uuid;

pub async fn overview(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Audited<Json<OverviewStats>>> {
    let stats = stats::overview(&state.db, Scope::for_caller(&caller)).await?;

    Ok(Audited::new(
        AuditEntry::collection(EntityKind::Stats, actions::VIEWED),
        Json(stats),
    ))
}

/// Statistics for one project; 404 when the project is not visible
pub async fn project_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<Json<ProjectStats>>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    authorize(&caller, Operation::Read, &project)?;

    let stats = stats::for_project(&state.db, Scope::for_caller(&caller), &project).await?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Stats, id, actions::VIEWED),
        Json(stats),
    ))
}
