use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single-use token mailed to an invited user; accepting it sets the initial
/// password and activates the account.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct InvitationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
