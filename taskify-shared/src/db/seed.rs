/// Startup seeding
///
/// Registration accepts a role, so an Admin can always be created through
/// the API. Seeding gives an installation a known Admin before anyone
/// registers: when no Admin exists and seed credentials are configured,
/// [`ensure_admin`] creates it together with a welcome task.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, validate_password_strength, PasswordError};
use crate::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
use crate::models::user::{CreateUser, Role, User};

/// Default username for the seeded admin
pub const DEFAULT_ADMIN_USERNAME: &str = "superadmin";

/// Credentials for the initial administrator
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Seed admin password rejected: {0}")]
    WeakPassword(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// What [`ensure_admin`] did
#[derive(Debug, Clone)]
pub enum SeedOutcome {
    /// An Admin already existed
    AlreadySeeded,

    /// The admin and welcome task were created
    Created(User),
}

/// Creates the initial Admin and a welcome task when no Admin exists
///
/// Both rows are written in one transaction.
pub async fn ensure_admin(pool: &PgPool, seed: &AdminSeed) -> Result<SeedOutcome, SeedError> {
    if User::count_admins(pool).await? > 0 {
        return Ok(SeedOutcome::AlreadySeeded);
    }

    validate_password_strength(&seed.password).map_err(SeedError::WeakPassword)?;
    let password_hash = hash_password(&seed.password)?;

    let mut tx = pool.begin().await?;

    let admin = User::create(
        &mut *tx,
        CreateUser {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password_hash,
            role: Role::Admin,
        },
    )
    .await?;

    Task::create(
        &mut *tx,
        CreateTask {
            project_id: None,
            title: "Welcome to Taskify".to_string(),
            description: Some(
                "Create a project, add tasks and tag them to see your dashboard fill up."
                    .to_string(),
            ),
            status: TaskStatus::Todo,
            priority: TaskPriority::Normal,
            due_date: None,
            created_by: admin.id,
            assigned_to: None,
        },
    )
    .await?;

    tx.commit().await?;

    info!(user_id = %admin.id, username = %admin.username, "Seeded initial administrator");
    Ok(SeedOutcome::Created(admin))
}

/// Runs [`ensure_admin`] when seed credentials are present
///
/// Without credentials, a warning is logged if the database has no Admin.
pub async fn seed_if_configured(pool: &PgPool, seed: Option<&AdminSeed>) -> Result<(), SeedError> {
    match seed {
        Some(seed) => {
            ensure_admin(pool, seed).await?;
        }
        None => {
            if User::count_admins(pool).await? == 0 {
                warn!("No administrator exists and SEED_ADMIN_EMAIL/SEED_ADMIN_PASSWORD are not set");
            }
        }
    }

    Ok(())
}
