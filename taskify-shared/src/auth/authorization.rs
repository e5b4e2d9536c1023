/// Access policy: entitlement checks and list scoping
///
/// Every decision about who may see or change what lives here, so handlers
/// never compare IDs or roles themselves.
///
/// # Permission Model
///
/// 1. **Admins** may read and change everything.
/// 2. **Stakeholders** may read and change the entities they are tied to:
///    a project's owner, a task's creator or assignee, a user themself.
/// 3. **Deletes** carry extra rules: only admins delete tasks and users, a
///    referenced tag cannot be deleted, and the last admin is never removed.
///
/// A denied `Read` reports the entity as not found so its existence isn't
/// leaked; a denied `Update` or `Delete` reports Forbidden.
///
/// # Example
///
/// ```
/// use taskify_shared::auth::authorization::{authorize, Operation, Scope};
/// use taskify_shared::auth::middleware::AuthContext;
/// use taskify_shared::models::project::Project;
/// use taskify_shared::models::user::Role;
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// let caller = AuthContext {
///     user_id: Uuid::new_v4(),
///     username: "jane".into(),
///     email: "jane@example.com".into(),
///     role: Role::User,
/// };
/// let project = Project {
///     id: Uuid::new_v4(),
///     name: "Website".into(),
///     description: String::new(),
///     owner_id: caller.user_id,
///     created_at: Utc::now(),
/// };
///
/// assert!(authorize(&caller, Operation::Update, &project).is_ok());
/// assert_eq!(Scope::for_caller(&caller).user_filter(), Some(caller.user_id));
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::{project::Project, task::Task, user::Role, user::User, EntityKind};

/// Why a request conflicts with current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The operation would leave no Admin
    LastAdmin,

    /// The tag is still linked to tasks
    TagInUse,
}

impl ConflictReason {
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::LastAdmin => "Cannot remove the last administrator",
            ConflictReason::TagInUse => "Tag is in use by one or more tasks",
        }
    }
}

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller may not perform the operation
    #[error("{0}")]
    Forbidden(String),

    /// Entity doesn't exist or is hidden from the caller
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// Operation conflicts with current state
    #[error("{}", .0.message())]
    Conflict(ConflictReason),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Kind of access being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Delete,
}

/// Entities whose access is granted to a set of identities
pub trait Entitled {
    /// Kind reported in NotFound errors
    const KIND: EntityKind;

    /// Identities entitled to the entity besides admins
    fn stakeholders(&self) -> Vec<Uuid>;
}

impl Entitled for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn stakeholders(&self) -> Vec<Uuid> {
        vec![self.owner_id]
    }
}

impl Entitled for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn stakeholders(&self) -> Vec<Uuid> {
        std::iter::once(self.created_by)
            .chain(self.assigned_to)
            .collect()
    }
}

impl Entitled for User {
    const KIND: EntityKind = EntityKind::User;

    fn stakeholders(&self) -> Vec<Uuid> {
        vec![self.id]
    }
}

pub fn is_admin(role: Role) -> bool {
    role.is_admin()
}

/// Admin, or one of the stakeholders
pub fn can_access(caller_id: Uuid, is_admin: bool, stakeholders: &[Uuid]) -> bool {
    is_admin || stakeholders.contains(&caller_id)
}

/// Filter applied to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No restriction
    All,

    /// Only entities the identity is a stakeholder of
    Stakeholder(Uuid),
}

impl Scope {
    pub fn for_caller(caller: &AuthContext) -> Self {
        if is_admin(caller.role) {
            Scope::All
        } else {
            Scope::Stakeholder(caller.user_id)
        }
    }

    /// Value bound to `($n::uuid IS NULL OR column = $n)` filters
    pub fn user_filter(&self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Stakeholder(id) => Some(*id),
        }
    }
}

/// Decides whether `caller` may perform `operation` on `resource`
pub fn authorize<R: Entitled>(
    caller: &AuthContext,
    operation: Operation,
    resource: &R,
) -> Result<(), AuthzError> {
    if can_access(caller.user_id, caller.is_admin(), &resource.stakeholders()) {
        return Ok(());
    }

    Err(match operation {
        Operation::Read => AuthzError::NotFound(R::KIND),
        Operation::Update | Operation::Delete => AuthzError::Forbidden(format!(
            "You are not allowed to modify this {}",
            R::KIND.as_str().to_lowercase()
        )),
    })
}

/// Entity being deleted, with the state the delete rules depend on
#[derive(Debug, Clone, Copy)]
pub enum DeleteTarget<'a> {
    Task,
    Project(&'a Project),
    Tag { usage_count: i64 },
    User { target: &'a User, admin_count: usize },
}

/// Decides whether `caller` may delete `target`
///
/// For users, `admin_count` must be read under the admin row locks taken
/// by [`User::lock_admins`] in the deleting transaction.
pub fn authorize_delete(caller: &AuthContext, target: DeleteTarget<'_>) -> Result<(), AuthzError> {
    match target {
        DeleteTarget::Task => {
            if !caller.is_admin() {
                return Err(AuthzError::Forbidden(
                    "Only administrators can delete tasks".to_string(),
                ));
            }
        }
        DeleteTarget::Project(project) => authorize(caller, Operation::Delete, project)?,
        DeleteTarget::Tag { usage_count } => {
            if usage_count > 0 {
                return Err(AuthzError::Conflict(ConflictReason::TagInUse));
            }
        }
        DeleteTarget::User { target, admin_count } => {
            if !caller.is_admin() {
                return Err(AuthzError::Forbidden(
                    "Only administrators can delete users".to_string(),
                ));
            }
            if target.role.is_admin() && admin_count <= 1 {
                return Err(AuthzError::Conflict(ConflictReason::LastAdmin));
            }
        }
    }

    Ok(())
}

/// Decides whether `caller` may update `target`, possibly changing its role
///
/// Only admins change roles. Demoting an Admin is refused while it is the
/// only one; `admin_count` follows the same locking rule as deletes.
pub fn authorize_user_update(
    caller: &AuthContext,
    target: &User,
    new_role: Option<Role>,
    admin_count: usize,
) -> Result<(), AuthzError> {
    authorize(caller, Operation::Update, target)?;

    let Some(role) = new_role else {
        return Ok(());
    };
    if role == target.role {
        return Ok(());
    }
    if !caller.is_admin() {
        return Err(AuthzError::Forbidden(
            "Only administrators can change roles".to_string(),
        ));
    }
    if target.role.is_admin() && admin_count <= 1 {
        return Err(AuthzError::Conflict(ConflictReason::LastAdmin));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "caller".to_string(),
            email: "caller@example.com".to_string(),
            role,
        }
    }

    fn project(owner: Uuid) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "P".to_string(),
            description: String::new(),
            owner_id: owner,
            created_at: Utc::now(),
        }
    }

    fn task(created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: None,
            title: "T".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Normal,
            due_date: None,
            created_at: Utc::now(),
            created_by,
            assigned_to,
        }
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "target".to_string(),
            email: "target@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_access() {
        let me = Uuid::new_v4();
        assert!(can_access(me, false, &[Uuid::new_v4(), me]));
        assert!(!can_access(me, false, &[Uuid::new_v4()]));
        assert!(can_access(me, true, &[]));
    }

    #[test]
    fn test_scope_for_caller() {
        let admin = ctx(Role::Admin);
        let member = ctx(Role::User);
        assert_eq!(Scope::for_caller(&admin), Scope::All);
        assert_eq!(Scope::for_caller(&admin).user_filter(), None);
        assert_eq!(Scope::for_caller(&member).user_filter(), Some(member.user_id));
    }

    #[test]
    fn test_task_stakeholders_include_assignee() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        assert_eq!(task(creator, None).stakeholders(), vec![creator]);
        assert_eq!(task(creator, Some(assignee)).stakeholders(), vec![creator, assignee]);

        let caller = AuthContext { user_id: assignee, ..ctx(Role::User) };
        assert!(authorize(&caller, Operation::Update, &task(creator, Some(assignee))).is_ok());
    }

    #[test]
    fn test_denied_read_is_not_found_and_denied_update_is_forbidden() {
        let caller = ctx(Role::User);
        let foreign = task(Uuid::new_v4(), None);

        assert!(matches!(
            authorize(&caller, Operation::Read, &foreign),
            Err(AuthzError::NotFound(EntityKind::Task))
        ));
        assert!(matches!(
            authorize(&caller, Operation::Update, &foreign),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_reads_everything() {
        let admin = ctx(Role::Admin);
        assert!(authorize(&admin, Operation::Read, &project(Uuid::new_v4())).is_ok());
        assert!(authorize(&admin, Operation::Update, &user(Role::User)).is_ok());
    }

    #[test]
    fn test_task_delete_is_admin_only() {
        assert!(matches!(
            authorize_delete(&ctx(Role::User), DeleteTarget::Task),
            Err(AuthzError::Forbidden(_))
        ));
        assert!(authorize_delete(&ctx(Role::Admin), DeleteTarget::Task).is_ok());
    }

    #[test]
    fn test_project_delete_owner_or_admin() {
        let owner = ctx(Role::User);
        let p = project(owner.user_id);
        assert!(authorize_delete(&owner, DeleteTarget::Project(&p)).is_ok());
        assert!(authorize_delete(&ctx(Role::Admin), DeleteTarget::Project(&p)).is_ok());
        assert!(matches!(
            authorize_delete(&ctx(Role::User), DeleteTarget::Project(&p)),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn test_tag_delete_blocked_while_referenced() {
        let caller = ctx(Role::User);
        assert!(matches!(
            authorize_delete(&caller, DeleteTarget::Tag { usage_count: 2 }),
            Err(AuthzError::Conflict(ConflictReason::TagInUse))
        ));
        assert!(authorize_delete(&caller, DeleteTarget::Tag { usage_count: 0 }).is_ok());
    }

    #[test]
    fn test_sole_admin_cannot_be_deleted() {
        let admin = ctx(Role::Admin);
        let sole = User { id: admin.user_id, ..user(Role::Admin) };

        assert!(matches!(
            authorize_delete(&admin, DeleteTarget::User { target: &sole, admin_count: 1 }),
            Err(AuthzError::Conflict(ConflictReason::LastAdmin))
        ));
    }

    #[test]
    fn test_second_admin_can_be_deleted() {
        let admin = ctx(Role::Admin);
        let other = user(Role::Admin);
        assert!(
            authorize_delete(&admin, DeleteTarget::User { target: &other, admin_count: 2 }).is_ok()
        );
    }

    #[test]
    fn test_user_delete_requires_admin() {
        let member = ctx(Role::User);
        let own = User { id: member.user_id, ..user(Role::User) };
        assert!(matches!(
            authorize_delete(&member, DeleteTarget::User { target: &own, admin_count: 1 }),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn test_role_changes() {
        let member = ctx(Role::User);
        let own = User { id: member.user_id, ..user(Role::User) };

        // Self-service profile edits are fine, self-promotion is not
        assert!(authorize_user_update(&member, &own, None, 1).is_ok());
        assert!(authorize_user_update(&member, &own, Some(Role::User), 1).is_ok());
        assert!(matches!(
            authorize_user_update(&member, &own, Some(Role::Admin), 1),
            Err(AuthzError::Forbidden(_))
        ));

        let admin = ctx(Role::Admin);
        let sole = User { id: admin.user_id, ..user(Role::Admin) };
        assert!(matches!(
            authorize_user_update(&admin, &sole, Some(Role::User), 1),
            Err(AuthzError::Conflict(ConflictReason::LastAdmin))
        ));
        assert!(authorize_user_update(&admin, &sole, Some(Role::User), 2).is_ok());
        assert!(authorize_user_update(&admin, &own, Some(Role::Admin), 1).is_ok());
    }

    #[test]
    fn test_foreign_user_update_forbidden() {
        let member = ctx(Role::User);
        assert!(matches!(
            authorize_user_update(&member, &user(Role::User), None, 1),
            Err(AuthzError::Forbidden(_))
        ));
    }
}
