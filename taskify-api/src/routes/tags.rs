/// Tag endpoints
///
/// Tags are global. Any authenticated user may list and create them; a tag
/// can only be deleted once no task references it.

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    routes::not_blank,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{
        authorization::{authorize_delete, DeleteTarget},
        middleware::AuthContext,
    },
    models::{tag::Tag, EntityKind},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 50, message = "Name must be at most 50 characters")
    )]
    pub name: String,
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Audited<Json<Vec<Tag>>>> {
    let tags = Tag::list(&state.db).await?;

    Ok(Audited::new(
        AuditEntry::collection(EntityKind::Tag, actions::VIEWED_LIST),
        Json(tags),
    ))
}

/// Create a tag
///
/// # Errors
///
/// - `400 Bad Request`: Blank or overlong name
/// - `409 Conflict`: A tag with this name already exists
pub async fn create_tag(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateTagRequest>,
) -> ApiResult<Audited<(StatusCode, Json<Tag>)>> {
    req.validate()?;
    let tag = Tag::create(&state.db, req.name.trim()).await?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Tag, tag.id, actions::CREATE),
        (StatusCode::CREATED, Json(tag)),
    ))
}

/// Delete an unused tag
///
/// # Errors
///
/// - `404 Not Found`: No such tag
/// - `409 Conflict`: At least one task still carries the tag
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<StatusCode>> {
    Tag::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    let usage_count = Tag::usage_count(&state.db, id).await?;
    authorize_delete(&caller, DeleteTarget::Tag { usage_count })?;

    // A link added after the count is caught by the RESTRICT foreign key
    if !Tag::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Tag not found".to_string()));
    }

    tracing::info!(tag_id = %id, deleted_by = %caller.user_id, "Tag deleted");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::Tag, id, actions::DELETE),
        StatusCode::NO_CONTENT,
    ))
}
