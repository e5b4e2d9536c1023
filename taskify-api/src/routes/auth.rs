/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get an access token

use crate::{
    app::AppState,
    audit::Audited,
    error::{ApiError, ApiResult},
    extract::AppJson,
    routes::users::UserView,
};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskify_shared::{
    audit::{actions, AuditEntry},
    auth::{jwt, password},
    models::{
        user::{CreateUser, Role, User},
        EntityKind,
    },
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be between 3 and 100 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked by `validate_password_strength`
    pub password: String,

    /// Defaults to User
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,

    pub expires_at: DateTime<Utc>,

    pub user: UserView,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "jane",
///   "email": "jane@example.com",
///   "password": "Secret123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists, in any letter case
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<Audited<Json<MessageResponse>>> {
    req.validate()?;
    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::field("password", msg))?;

    let password_hash = password::hash_password(&req.password)?;

    // The unique index on LOWER(email) settles concurrent registrations
    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: req.role.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(Audited::new(
        AuditEntry::new(EntityKind::User, user.id, actions::REGISTER).with_actor(user.id),
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Login endpoint
///
/// Unknown email and wrong password produce the same 401.
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ...",
///   "expiresAt": "2025-01-01T01:00:00Z",
///   "user": { "id": "uuid", "username": "jane", "email": "jane@example.com", "role": "User", "createdAt": "..." }
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Audited<Json<LoginResponse>>> {
    req.validate()?;

    let account = User::find_by_email(&state.db, &req.email).await?;
    let user = check_credentials(account, &req.password, password::verify_password)?;

    let (token, expires_at) = jwt::issue_for_user(&user, &state.config.jwt)?;

    Ok(Audited::new(
        AuditEntry::new(EntityKind::User, user.id, actions::LOGIN).with_actor(user.id),
        Json(LoginResponse {
            token,
            expires_at,
            user: user.into(),
        }),
    ))
}

/// Runs the password verifier exactly once whether or not the account exists
fn check_credentials(
    account: Option<User>,
    candidate: &str,
    verify: impl FnOnce(&str, &str) -> Result<bool, password::PasswordError>,
) -> ApiResult<User> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    match account {
        Some(user) => {
            if verify(candidate, &user.password_hash)? {
                Ok(user)
            } else {
                tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
                Err(invalid())
            }
        }
        None => {
            verify(candidate, password::dummy_hash()?)?;
            tracing::debug!("Login rejected: unknown email");
            Err(invalid())
        }
    }
}
