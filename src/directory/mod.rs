pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

pub const LAST_ADMIN_ROLE_MESSAGE: &str =
    "Cannot change the role of the last administrator. Add another administrator first.";
pub const LAST_ADMIN_DELETE_MESSAGE: &str =
    "Cannot delete the last administrator. Add another administrator first.";

#[derive(Debug, PartialEq, Eq)]
pub enum DirectoryError {
    /// No active user with the given id.
    NotFound,
    /// The mutation would leave the active set without an administrator.
    LastAdmin,
    /// An active user already holds the email.
    DuplicateEmail,
    Store(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::NotFound => write!(f, "user not found"),
            DirectoryError::LastAdmin => write!(f, "last administrator is protected"),
            DirectoryError::DuplicateEmail => write!(f, "email already registered"),
            DirectoryError::Store(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        DirectoryError::Store(err.to_string())
    }
}

/// The user-directory capability: one interface, two implementations. The
/// networked one backs the service; the in-memory one stands in where no
/// database is available, the way the original development mocks did.
///
/// `update_role` and `delete` read the active-admin count and apply the
/// mutation inside one critical section, so concurrent demotions cannot both
/// observe a count of two and strand the directory without an administrator.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Active users, newest first. `include_deleted` adds tombstoned rows.
    async fn list(&self, include_deleted: bool) -> Result<Vec<User>, DirectoryError>;

    /// Lookup by id, tombstoned rows included.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError>;

    /// Create an invited user without a password. Re-inviting a tombstoned
    /// email restores the row with the new role; an active duplicate is
    /// rejected.
    async fn invite(&self, email: &str, role: &str) -> Result<User, DirectoryError>;

    /// Change an active user's role. Demoting the sole active administrator
    /// fails with [`DirectoryError::LastAdmin`].
    async fn update_role(&self, id: Uuid, role: &str) -> Result<User, DirectoryError>;

    /// Logically delete an active user. Deleting the sole active
    /// administrator fails with [`DirectoryError::LastAdmin`].
    async fn delete(&self, id: Uuid) -> Result<User, DirectoryError>;
}

pub fn role_error(err: DirectoryError) -> AppError {
    match err {
        DirectoryError::LastAdmin => AppError::Invariant(LAST_ADMIN_ROLE_MESSAGE.to_string()),
        other => directory_error(other),
    }
}

pub fn delete_error(err: DirectoryError) -> AppError {
    match err {
        DirectoryError::LastAdmin => AppError::Invariant(LAST_ADMIN_DELETE_MESSAGE.to_string()),
        other => directory_error(other),
    }
}

pub fn directory_error(err: DirectoryError) -> AppError {
    match err {
        DirectoryError::NotFound => AppError::NotFound("User not found".to_string()),
        DirectoryError::LastAdmin => AppError::Invariant(LAST_ADMIN_ROLE_MESSAGE.to_string()),
        DirectoryError::DuplicateEmail => {
            AppError::Conflict("A user with this email already exists".to_string())
        }
        DirectoryError::Store(msg) => AppError::Internal(msg),
    }
}
