/// Password hashing using Argon2id
///
/// Hashes are PHC strings that embed algorithm, parameters and salt, so
/// verification needs nothing but the stored string.
///
/// # Example
///
/// ```
/// use taskify_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret1")?;
/// assert!(verify_password("Secret1", &hash)?);
/// assert!(!verify_password("secret1", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use std::sync::OnceLock;

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Argon2<'static> {
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash in constant time
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` if it doesn't
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match hasher().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// A hash with the same parameters as real ones, for logins to unknown accounts
///
/// Verifying against it takes as long as verifying a real password.
/// Computed once, on first use.
pub fn dummy_hash() -> Result<&'static str, PasswordError> {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = hash_password("taskify-unknown-account")?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

/// Validates password strength
///
/// Requirements:
/// - At least 6 characters long
/// - Contains at least one uppercase letter
/// - Contains at least one lowercase letter
/// - Contains at least one digit
///
/// # Example
///
/// ```
/// use taskify_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Abc123").is_ok());
/// assert!(validate_password_strength("Ab1").is_err());
/// assert!(validate_password_strength("abcdef1").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("Secret1").expect("Hash should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("Secret1").unwrap();
        let hash2 = hash_password("Secret1").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_password("Secret1", &hash1).unwrap());
        assert!(verify_password("Secret1", &hash2).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("Secret1").unwrap();
        assert!(!verify_password("Secret2", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("Secret1", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_dummy_hash_is_stable_and_verifiable() {
        let first = dummy_hash().unwrap();
        let second = dummy_hash().unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(!verify_password("Secret1", first).unwrap());
    }

    #[test]
    fn test_validate_password_strength_valid() {
        assert!(validate_password_strength("Abc123").is_ok());
        assert!(validate_password_strength("CorrectHorse9").is_ok());
    }

    #[test]
    fn test_validate_password_strength_too_short() {
        let err = validate_password_strength("Ab1").unwrap_err();
        assert!(err.contains("at least 6"));
    }

    #[test]
    fn test_validate_password_strength_missing_classes() {
        assert!(validate_password_strength("abcdef1")
            .unwrap_err()
            .contains("uppercase"));
        assert!(validate_password_strength("ABCDEF1")
            .unwrap_err()
            .contains("lowercase"));
        assert!(validate_password_strength("Abcdefg")
            .unwrap_err()
            .contains("digit"));
    }
}
