/// Database models for Taskify
///
/// This module contains all database models and their queries.
///
/// # Models
///
/// - `user`: Identities, credentials and roles
/// - `project`: Projects owned by a user
/// - `task`: Tasks with status, priority, creator and assignee
/// - `tag`: Tags and the task/tag join relation
/// - `attachment`: File metadata attached to tasks
/// - `activity_log`: Append-only audit trail
///
/// # Example
///
/// ```no_run
/// use taskify_shared::models::user::{CreateUser, Role, User};
/// use taskify_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "jane".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::User,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity_log;
pub mod attachment;
pub mod project;
pub mod tag;
pub mod task;
pub mod user;

use serde::{Deserialize, Serialize};

/// Kinds of entity that can be authorized and audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Project,
    Task,
    Tag,
    Attachment,

    /// Dashboard statistics; audited but never authorized directly
    Stats,
}

impl EntityKind {
    /// Name stored in `activity_logs.entity_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Project => "Project",
            EntityKind::Task => "Task",
            EntityKind::Tag => "Tag",
            EntityKind::Attachment => "Attachment",
            EntityKind::Stats => "Stats",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or submitted enum string is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}
