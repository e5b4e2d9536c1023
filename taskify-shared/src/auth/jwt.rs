/// JWT token generation and validation module
///
/// Bearer tokens carry the caller's identity and role so request handling
/// never needs a database round trip to authenticate.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable via [`JwtSettings::expire_minutes`] (default 60)
/// - **Validation**: Signature, expiration, not-before, issuer and (when
///   configured) audience
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use taskify_shared::auth::jwt::{create_token, validate_token, Claims, JwtSettings};
/// use taskify_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = JwtSettings::new("your-secret-key-at-least-32-bytes-long");
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "jane", "jane@example.com", Role::User, &settings);
/// let token = create_token(&claims, &settings)?;
///
/// let validated = validate_token(&token, &settings)?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Default issuer claim
pub const DEFAULT_ISSUER: &str = "taskify";

/// Default token lifetime in minutes
pub const DEFAULT_EXPIRE_MINUTES: i64 = 60;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Issuer claim doesn't match configuration
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Audience claim doesn't match configuration
    #[error("Invalid audience")]
    InvalidAudience,
}

/// Signing and validation parameters
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC secret
    pub secret: String,

    /// Value of the `iss` claim
    pub issuer: String,

    /// Value of the `aud` claim; not checked when None
    pub audience: Option<String>,

    /// Token lifetime
    pub expire_minutes: i64,
}

impl JwtSettings {
    /// Settings with the default issuer, no audience and a 60 minute lifetime
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: None,
            expire_minutes: DEFAULT_EXPIRE_MINUTES,
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer
/// - `aud`: Audience (optional)
/// - `iat` / `nbf` / `exp`: Issued at, not before, expiration
///
/// # Custom Claims
///
/// - `username`, `email`, `role`: Identity snapshot at issue time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    pub username: String,
    pub email: String,
    pub role: Role,

    /// Issuer
    pub iss: String,

    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims that expire after `settings.expire_minutes`
    pub fn new(
        user_id: Uuid,
        username: &str,
        email: &str,
        role: Role,
        settings: &JwtSettings,
    ) -> Self {
        Self::with_expiration(
            user_id,
            username,
            email,
            role,
            settings,
            Duration::minutes(settings.expire_minutes),
        )
    }

    /// Creates claims with a custom lifetime
    ///
    /// A negative `expires_in` yields an already-expired token, which is
    /// useful in tests.
    pub fn with_expiration(
        user_id: Uuid,
        username: &str,
        email: &str,
        role: Role,
        settings: &JwtSettings,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            username: username.to_string(),
            email: email.to_string(),
            role,
            iss: settings.issuer.clone(),
            aud: settings.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Creates a signed HS256 token from claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token encoding fails
pub fn create_token(claims: &Claims, settings: &JwtSettings) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(settings.secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts claims
///
/// Verifies:
/// - Signature is valid
/// - Token hasn't expired and is not used before `nbf`
/// - Issuer matches `settings.issuer`
/// - Audience matches `settings.audience` when one is configured
pub fn validate_token(token: &str, settings: &JwtSettings) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(settings.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.issuer.as_str()]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    match &settings.audience {
        Some(audience) => validation.set_audience(&[audience.as_str()]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: settings.issuer.clone(),
        },
        jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Issues an access token for a user
///
/// # Returns
///
/// The token and its expiration time
pub fn issue_for_user(
    user: &User,
    settings: &JwtSettings,
) -> Result<(String, DateTime<Utc>), JwtError> {
    let claims = Claims::new(user.id, &user.username, &user.email, user.role, settings);
    let token = create_token(&claims, settings)?;

    Ok((token, claims.expires_at()))
}
