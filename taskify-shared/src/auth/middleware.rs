/// Bearer authentication for request middleware
///
/// This module turns an `Authorization` header value into an [`AuthContext`].
/// It is framework-agnostic; the API server's JWT layer calls
/// [`authenticate`] and inserts the resulting context into request
/// extensions, where handlers read it with `Extension<AuthContext>`.
///
/// # Example
///
/// ```
/// use taskify_shared::auth::jwt::{create_token, Claims, JwtSettings};
/// use taskify_shared::auth::middleware::authenticate;
/// use taskify_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let settings = JwtSettings::new("your-secret-key-at-least-32-bytes-long");
/// let claims = Claims::new(Uuid::new_v4(), "jane", "jane@example.com", Role::User, &settings);
/// let token = create_token(&claims, &settings).unwrap();
///
/// let header = format!("Bearer {}", token);
/// let auth = authenticate(Some(&header), &settings).unwrap();
/// assert_eq!(auth.user_id, claims.sub);
/// assert!(!auth.is_admin());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError, JwtSettings};
use crate::models::user::Role;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    pub username: String,
    pub email: String,

    /// Role as of token issue time
    pub role: Role,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Reasons a request fails authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidScheme,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::InvalidAudience => AuthError::InvalidToken("Invalid audience".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Extracts the token from a `Bearer <token>` header value
///
/// The scheme name is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the caller from an `Authorization` header value
///
/// # Errors
///
/// - `MissingCredentials` when the header is absent
/// - `InvalidScheme` when it is not a Bearer credential
/// - `Expired` / `InvalidToken` when token validation fails
pub fn authenticate(header: Option<&str>, settings: &JwtSettings) -> Result<AuthContext, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let token = bearer_token(header).ok_or(AuthError::InvalidScheme)?;
    let claims = validate_token(token, settings)?;

    Ok(AuthContext::from_claims(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn token(settings: &JwtSettings, role: Role, ttl: Duration) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let claims = Claims::with_expiration(id, "sam", "sam@example.com", role, settings, ttl);
        (id, create_token(&claims, settings).unwrap())
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[test]
    fn test_authenticate_success() {
        let settings = JwtSettings::new(SECRET);
        let (id, token) = token(&settings, Role::Admin, Duration::minutes(5));

        let auth = authenticate(Some(&format!("Bearer {}", token)), &settings).unwrap();
        assert_eq!(auth.user_id, id);
        assert_eq!(auth.username, "sam");
        assert!(auth.is_admin());
    }

    #[test]
    fn test_authenticate_failures() {
        let settings = JwtSettings::new(SECRET);

        assert!(matches!(
            authenticate(None, &settings),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(Some("Token abc"), &settings),
            Err(AuthError::InvalidScheme)
        ));
        assert!(matches!(
            authenticate(Some("Bearer abc.def.ghi"), &settings),
            Err(AuthError::InvalidToken(_))
        ));

        let (_, expired) = token(&settings, Role::User, Duration::hours(-2));
        assert!(matches!(
            authenticate(Some(&format!("Bearer {}", expired)), &settings),
            Err(AuthError::Expired)
        ));
    }
}
