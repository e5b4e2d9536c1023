//! Activity auditing
//!
//! Every successful state change, and every read of a protected resource,
//! appends one entry to the activity log. Recording is best-effort: a sink
//! failure is logged and reported to the caller as an [`AuditOutcome`], but
//! never undoes the operation being audited.
//!
//! The sink is a trait so the HTTP layer can be tested without a database.
//!
//! # Example
//!
//! ```no_run
//! use taskify_shared::audit::{actions, AuditEntry, AuditLogger};
//! use taskify_shared::models::EntityKind;
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, caller: Uuid, project_id: Uuid) {
//! let audit = AuditLogger::postgres(pool);
//! let entry = AuditEntry::new(EntityKind::Project, project_id, actions::CREATE);
//! let outcome = audit.record(entry, Some(caller)).await;
//! assert!(outcome.is_recorded());
//! # }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::activity_log::{ActivityLogEntry, NewActivityLogEntry};
use crate::models::EntityKind;

/// Action names written to `activity_logs.action`
pub mod actions {
    pub const REGISTER: &str = "Register";
    pub const LOGIN: &str = "Login";
    pub const CREATE: &str = "Create";
    pub const UPDATE: &str = "Update";
    pub const DELETE: &str = "Delete";
    pub const REPLACE_TAGS: &str = "ReplaceTags";
    pub const ADD_ATTACHMENT: &str = "AddAttachment";
    pub const VIEWED: &str = "Viewed";
    pub const VIEWED_LIST: &str = "Viewed list";
}

/// A pending activity log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub entity_type: EntityKind,

    /// None for collection-level actions
    pub entity_id: Option<Uuid>,

    pub action: String,

    /// Explicit actor, for requests made before the caller is authenticated
    /// (register, login). Otherwise the request's caller is used.
    pub actor: Option<Uuid>,
}

impl AuditEntry {
    /// Entry about a single entity
    pub fn new(entity_type: EntityKind, entity_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: Some(entity_id),
            action: action.into(),
            actor: None,
        }
    }

    /// Entry about a whole collection, such as a list read
    pub fn collection(entity_type: EntityKind, action: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: None,
            action: action.into(),
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: Uuid) -> Self {
        self.actor = Some(actor);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to append activity log entry: {0}")]
    Sink(#[from] sqlx::Error),

    #[error("Activity sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination of activity log entries
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn append(&self, entry: NewActivityLogEntry) -> Result<(), AuditError>;
}

/// Production sink writing to `activity_logs`
#[derive(Debug, Clone)]
pub struct PgActivitySink {
    pool: PgPool,
}

impl PgActivitySink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivitySink for PgActivitySink {
    async fn append(&self, entry: NewActivityLogEntry) -> Result<(), AuditError> {
        ActivityLogEntry::append(&self.pool, entry).await?;
        Ok(())
    }
}

/// In-memory sink that keeps entries for inspection
#[derive(Debug, Default, Clone)]
pub struct MemoryActivitySink {
    entries: Arc<Mutex<Vec<NewActivityLogEntry>>>,
}

impl MemoryActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries appended so far
    pub fn entries(&self) -> Vec<NewActivityLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ActivitySink for MemoryActivitySink {
    async fn append(&self, entry: NewActivityLogEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?
            .push(entry);
        Ok(())
    }
}

/// Result of recording an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Recorded,

    /// No actor was known, so nothing was written
    Skipped,

    /// The sink failed; the message is safe to show to clients
    Failed(String),
}

impl AuditOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AuditOutcome::Recorded)
    }
}

/// Records activity through an [`ActivitySink`]
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn ActivitySink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self { sink }
    }

    /// Logger backed by the `activity_logs` table
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgActivitySink::new(pool)))
    }

    /// Appends one entry
    ///
    /// The entry's own actor wins over `caller`. Failures are logged and
    /// returned, never propagated as errors.
    pub async fn record(&self, entry: AuditEntry, caller: Option<Uuid>) -> AuditOutcome {
        let Some(user_id) = entry.actor.or(caller) else {
            warn!(
                entity_type = %entry.entity_type,
                action = %entry.action,
                "Activity entry has no actor, not recorded"
            );
            return AuditOutcome::Skipped;
        };

        let row = NewActivityLogEntry {
            entity_type: entry.entity_type.as_str().to_string(),
            entity_id: entry.entity_id,
            action: entry.action,
            user_id,
        };

        match self.sink.append(row.clone()).await {
            Ok(()) => {
                debug!(
                    entity_type = %row.entity_type,
                    entity_id = ?row.entity_id,
                    action = %row.action,
                    user_id = %row.user_id,
                    "Activity recorded"
                );
                AuditOutcome::Recorded
            }
            Err(e) => {
                warn!(
                    error = %e,
                    entity_type = %row.entity_type,
                    entity_id = ?row.entity_id,
                    action = %row.action,
                    "Failed to record activity"
                );
                AuditOutcome::Failed("Activity log entry could not be recorded".to_string())
            }
        }
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    #[async_trait]
    impl ActivitySink for BrokenSink {
        async fn append(&self, _entry: NewActivityLogEntry) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("disk on fire".to_string()))
        }
    }

    #[tokio::test]
    async fn test_record_uses_caller_as_actor() {
        let sink = MemoryActivitySink::new();
        let audit = AuditLogger::new(Arc::new(sink.clone()));
        let caller = Uuid::new_v4();
        let project = Uuid::new_v4();

        let outcome = audit
            .record(AuditEntry::new(EntityKind::Project, project, actions::CREATE), Some(caller))
            .await;

        assert_eq!(outcome, AuditOutcome::Recorded);
        assert_eq!(
            sink.entries(),
            vec![NewActivityLogEntry {
                entity_type: "Project".to_string(),
                entity_id: Some(project),
                action: "Create".to_string(),
                user_id: caller,
            }]
        );
    }

    #[tokio::test]
    async fn test_explicit_actor_wins() {
        let sink = MemoryActivitySink::new();
        let audit = AuditLogger::new(Arc::new(sink.clone()));
        let new_user = Uuid::new_v4();

        let entry = AuditEntry::new(EntityKind::User, new_user, actions::REGISTER).with_actor(new_user);
        audit.record(entry, None).await;

        assert_eq!(sink.entries()[0].user_id, new_user);
    }

    #[tokio::test]
    async fn test_collection_entry_has_no_entity_id() {
        let sink = MemoryActivitySink::new();
        let audit = AuditLogger::new(Arc::new(sink.clone()));

        audit
            .record(AuditEntry::collection(EntityKind::Task, actions::VIEWED_LIST), Some(Uuid::new_v4()))
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].entity_id, None);
        assert_eq!(entries[0].action, "Viewed list");
    }

    #[tokio::test]
    async fn test_missing_actor_is_skipped() {
        let sink = MemoryActivitySink::new();
        let audit = AuditLogger::new(Arc::new(sink.clone()));

        let outcome = audit
            .record(AuditEntry::collection(EntityKind::Tag, actions::VIEWED_LIST), None)
            .await;

        assert_eq!(outcome, AuditOutcome::Skipped);
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported_not_raised() {
        let audit = AuditLogger::new(Arc::new(BrokenSink));

        let outcome = audit
            .record(
                AuditEntry::new(EntityKind::Tag, Uuid::new_v4(), actions::DELETE),
                Some(Uuid::new_v4()),
            )
            .await;

        assert!(matches!(outcome, AuditOutcome::Failed(_)));
        assert!(!outcome.is_recorded());
    }
}
