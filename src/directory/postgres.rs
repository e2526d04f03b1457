use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{ROLE_ADMIN, ROLE_USER, User};

use super::{DirectoryError, UserDirectory};

/// Networked directory over Postgres. The invariant-guarded mutations lock
/// the target row and the active admin rows (`FOR UPDATE`) in one
/// transaction, so the count they act on cannot go stale under concurrent
/// writers.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn count_active_admins_locked(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<i64, sqlx::Error> {
    // FOR UPDATE in the subquery serializes concurrent demote/delete attempts
    // on the same admin set.
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM (
             SELECT id FROM users
             WHERE role = $1 AND is_deleted = FALSE
             FOR UPDATE
         ) AS active_admins",
    )
    .bind(ROLE_ADMIN)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn list(&self, include_deleted: bool) -> Result<Vec<User>, DirectoryError> {
        Ok(db::users::list(&self.pool, include_deleted).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError> {
        Ok(db::users::find_by_id(&self.pool, id).await?)
    }

    async fn invite(&self, email: &str, role: &str) -> Result<User, DirectoryError> {
        match db::users::find_by_email(&self.pool, email).await? {
            Some(existing) if !existing.is_deleted => Err(DirectoryError::DuplicateEmail),
            Some(existing) => Ok(db::users::restore(&self.pool, existing.id, role, None).await?),
            None => Ok(db::users::create(&self.pool, email, None, role).await?),
        }
    }

    async fn update_role(&self, id: Uuid, role: &str) -> Result<User, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        let target: Option<User> = sqlx::query_as(
            "SELECT * FROM users WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let target = target.ok_or(DirectoryError::NotFound)?;

        if target.role == ROLE_ADMIN && role == ROLE_USER {
            let admins = count_active_admins_locked(&mut tx).await?;
            if admins == 1 {
                return Err(DirectoryError::LastAdmin);
            }
        }

        let updated: User =
            sqlx::query_as("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(role)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<User, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        let target: Option<User> = sqlx::query_as(
            "SELECT * FROM users WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let target = target.ok_or(DirectoryError::NotFound)?;

        if target.role == ROLE_ADMIN {
            let admins = count_active_admins_locked(&mut tx).await?;
            if admins == 1 {
                return Err(DirectoryError::LastAdmin);
            }
        }

        let deleted: User = sqlx::query_as(
            "UPDATE users SET is_deleted = TRUE, deleted_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(deleted)
    }
}
