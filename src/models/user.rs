use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// An account in the directory. Rows are never physically removed; deletion
/// flips `is_deleted` and stamps `deleted_at` so the identity stays
/// resolvable for history records and audit trails.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// None until an invited user accepts the invitation.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: String,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Accepted role values for invite / role-change requests.
pub fn valid_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_USER
}
