/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: User management (`/auth/users`)
/// - `projects`, `tasks`, `tags`: Resource CRUD
/// - `stats`: Dashboard statistics
///
/// Every handler follows the same order: identity from the JWT layer,
/// input validation, policy decision, storage, audit entry, view.

pub mod auth;
pub mod health;
pub mod projects;
pub mod stats;
pub mod tags;
pub mod tasks;
pub mod users;

use validator::ValidationError;

/// Rejects values that are empty or only whitespace
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
