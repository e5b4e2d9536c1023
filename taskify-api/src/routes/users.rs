/// User management endpoints
///
/// - `GET /api/auth/users` - Users visible to the caller (admins see all)
/// - `GET /api/auth/users/:id` - One user; 404 when not visible
/// - `PUT /api/auth/users/:id` - Update profile, password or role
/// - `DELETE /api/auth/users/:id` - Admin only; the last Admin is kept

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{
        authorization::{authorize, authorize_delete, authorize_user_update, DeleteTarget, Operation, Scope},
        middleware::AuthContext,
        password,
    },
    models::{
        user::{Role, UpdateUser, User},
        EntityKind,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Public view of a user; never includes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be between 3 and 100 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// New password; unchanged when absent
    pub password: Option<String>,

    /// New role; only admins may change it
    pub role: Option<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Audited<Json<Vec<UserView>>>> {
    let users = User::list(&state.db, Scope::for_caller(&caller).user_filter()).await?;

    Ok(Audited::new(
        AuditEntry::collection(EntityKind::User, actions::VIEWED_LIST),
        Json(users.into_iter().map(UserView::from).collect()),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<Json<UserView>>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    authorize(&caller, Operation::Read, &user)?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::User, id, actions::VIEWED),
        Json(user.into()),
    ))
}

/// Update a user
///
/// The caller may update themself; admins may update anyone. A role change
/// takes the admin row locks so two concurrent demotions cannot both pass
/// the last-admin check.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Not the caller's record, or a non-admin changing a role
/// - `404 Not Found`: No such user
/// - `409 Conflict`: Email taken, or demoting the last Admin
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<Audited<StatusCode>> {
    req.validate()?;
    let password_hash = match req.password.as_deref() {
        Some(new_password) => {
            password::validate_password_strength(new_password)
                .map_err(|msg| ApiError::field("password", msg))?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let mut tx = state.db.begin().await?;

    let target = User::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let demotes_admin = target.role.is_admin() && req.role.is_some_and(|role| !role.is_admin());
    let admin_count = if demotes_admin {
        User::lock_admins(&mut tx).await?.len()
    } else {
        0
    };
    authorize_user_update(&caller, &target, req.role, admin_count)?;

    User::update(
        &mut *tx,
        id,
        UpdateUser {
            username: Some(req.username),
            email: Some(req.email),
            password_hash,
            role: req.role,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %id, updated_by = %caller.user_id, "User updated");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::User, id, actions::UPDATE),
        StatusCode::NO_CONTENT,
    ))
}

/// Delete a user (admin only)
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user
/// - `409 Conflict`: Last Admin, or the user still created tasks
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Audited<StatusCode>> {
    let mut tx = state.db.begin().await?;

    let target = User::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let admin_count = User::lock_admins(&mut tx).await?.len();

    authorize_delete(
        &caller,
        DeleteTarget::User {
            target: &target,
            admin_count,
        },
    )?;

    User::delete(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %id, deleted_by = %caller.user_id, "User deleted");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::User, id, actions::DELETE),
        StatusCode::NO_CONTENT,
    ))
}
