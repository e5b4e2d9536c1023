/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer header parsing into an [`middleware::AuthContext`]
/// - [`authorization`]: Access policy and list scoping
///
/// # Example
///
/// ```no_run
/// use taskify_shared::auth::password::{hash_password, verify_password};
/// use taskify_shared::auth::jwt::{create_token, Claims, JwtSettings};
/// use taskify_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret1")?;
/// assert!(verify_password("Secret1", &hash)?);
///
/// let settings = JwtSettings::new("your-secret-key-at-least-32-bytes-long");
/// let claims = Claims::new(Uuid::new_v4(), "jane", "jane@example.com", Role::User, &settings);
/// let token = create_token(&claims, &settings)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
