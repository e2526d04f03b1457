use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{ROLE_ADMIN, ROLE_USER, User};

use super::{DirectoryError, UserDirectory};

/// In-memory directory over a single mutex. Check-and-mutate happens under
/// one lock, which gives the same atomicity the Postgres implementation gets
/// from its transaction.
pub struct MemoryDirectory {
    users: Mutex<Vec<User>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
        }
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    fn active_admin_count(users: &[User]) -> usize {
        users
            .iter()
            .filter(|u| !u.is_deleted && u.role == ROLE_ADMIN)
            .count()
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn list(&self, include_deleted: bool) -> Result<Vec<User>, DirectoryError> {
        let users = self.users.lock().unwrap();
        let mut out: Vec<User> = users
            .iter()
            .filter(|u| include_deleted || !u.is_deleted)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn invite(&self, email: &str, role: &str) -> Result<User, DirectoryError> {
        let mut users = self.users.lock().unwrap();

        if let Some(existing) = users.iter_mut().find(|u| u.email == email) {
            if !existing.is_deleted {
                return Err(DirectoryError::DuplicateEmail);
            }
            existing.is_deleted = false;
            existing.deleted_at = None;
            existing.role = role.to_string();
            existing.password_hash = None;
            return Ok(existing.clone());
        }

        let user = User {
            id: Uuid::now_v7(),
            email: email.to_string(),
            password_hash: None,
            role: role.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_role(&self, id: Uuid, role: &str) -> Result<User, DirectoryError> {
        let mut users = self.users.lock().unwrap();

        let target = users
            .iter()
            .find(|u| u.id == id && !u.is_deleted)
            .ok_or(DirectoryError::NotFound)?;

        if target.role == ROLE_ADMIN && role == ROLE_USER
            && Self::active_admin_count(&users) == 1
        {
            return Err(DirectoryError::LastAdmin);
        }

        let target = users
            .iter_mut()
            .find(|u| u.id == id)
            .expect("target vanished under the lock");
        target.role = role.to_string();
        Ok(target.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<User, DirectoryError> {
        let mut users = self.users.lock().unwrap();

        let target = users
            .iter()
            .find(|u| u.id == id && !u.is_deleted)
            .ok_or(DirectoryError::NotFound)?;

        if target.role == ROLE_ADMIN && Self::active_admin_count(&users) == 1 {
            return Err(DirectoryError::LastAdmin);
        }

        let target = users
            .iter_mut()
            .find(|u| u.id == id)
            .expect("target vanished under the lock");
        target.is_deleted = true;
        target.deleted_at = Some(Utc::now());
        Ok(target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, role: &str) -> User {
        User {
            id: Uuid::now_v7(),
            email: email.to_string(),
            password_hash: None,
            role: role.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    fn seeded(specs: &[(&str, &str)]) -> (MemoryDirectory, Vec<Uuid>) {
        let users: Vec<User> = specs.iter().map(|(e, r)| user(e, r)).collect();
        let ids = users.iter().map(|u| u.id).collect();
        (MemoryDirectory::with_users(users), ids)
    }

    #[tokio::test]
    async fn demoting_sole_admin_is_rejected_and_leaves_set_unchanged() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_USER)]);

        let err = dir.update_role(ids[0], ROLE_USER).await.unwrap_err();
        assert_eq!(err, DirectoryError::LastAdmin);

        let admin = dir.find_by_id(ids[0]).await.unwrap().unwrap();
        assert_eq!(admin.role, ROLE_ADMIN);
        assert!(!admin.is_deleted);
    }

    #[tokio::test]
    async fn deleting_sole_admin_is_rejected() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_USER)]);

        let err = dir.delete(ids[0]).await.unwrap_err();
        assert_eq!(err, DirectoryError::LastAdmin);
        assert!(dir.find_by_id(ids[0]).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn demotion_succeeds_while_another_admin_remains() {
        let (dir, ids) = seeded(&[
            ("a@x.test", ROLE_ADMIN),
            ("b@x.test", ROLE_ADMIN),
            ("c@x.test", ROLE_USER),
        ]);

        // Two admins: demoting one is fine.
        let updated = dir.update_role(ids[0], ROLE_USER).await.unwrap();
        assert_eq!(updated.role, ROLE_USER);

        // Down to one admin: both demotion and deletion are now blocked.
        assert_eq!(
            dir.update_role(ids[1], ROLE_USER).await.unwrap_err(),
            DirectoryError::LastAdmin
        );
        assert_eq!(dir.delete(ids[1]).await.unwrap_err(), DirectoryError::LastAdmin);
    }

    #[tokio::test]
    async fn deleting_an_admin_with_a_peer_leaves_one_behind() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_ADMIN)]);

        let deleted = dir.delete(ids[1]).await.unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());

        let active = dir.list(false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].is_admin());
    }

    #[tokio::test]
    async fn deleted_user_stays_retrievable_but_leaves_the_active_listing() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_USER)]);

        dir.delete(ids[1]).await.unwrap();

        assert!(dir.find_by_id(ids[1]).await.unwrap().is_some());
        assert!(
            dir.list(false)
                .await
                .unwrap()
                .iter()
                .all(|u| u.id != ids[1])
        );
        assert!(dir.list(true).await.unwrap().iter().any(|u| u.id == ids[1]));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_set_is_unchanged() {
        let (dir, _) = seeded(&[("a@x.test", ROLE_ADMIN)]);

        let before = dir.list(true).await.unwrap().len();
        assert_eq!(
            dir.delete(Uuid::now_v7()).await.unwrap_err(),
            DirectoryError::NotFound
        );
        assert_eq!(
            dir.update_role(Uuid::now_v7(), ROLE_USER).await.unwrap_err(),
            DirectoryError::NotFound
        );
        assert_eq!(dir.list(true).await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn mutating_a_tombstoned_user_is_not_found() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_USER)]);
        dir.delete(ids[1]).await.unwrap();

        assert_eq!(
            dir.update_role(ids[1], ROLE_ADMIN).await.unwrap_err(),
            DirectoryError::NotFound
        );
        assert_eq!(dir.delete(ids[1]).await.unwrap_err(), DirectoryError::NotFound);
    }

    #[tokio::test]
    async fn promoting_the_sole_admin_again_is_a_no_op_not_an_error() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN)]);

        // admin -> admin never trips the guard
        let updated = dir.update_role(ids[0], ROLE_ADMIN).await.unwrap();
        assert_eq!(updated.role, ROLE_ADMIN);
    }

    #[tokio::test]
    async fn invite_rejects_active_duplicate_and_restores_tombstone() {
        let (dir, ids) = seeded(&[("a@x.test", ROLE_ADMIN), ("b@x.test", ROLE_USER)]);

        assert_eq!(
            dir.invite("b@x.test", ROLE_USER).await.unwrap_err(),
            DirectoryError::DuplicateEmail
        );

        dir.delete(ids[1]).await.unwrap();
        let restored = dir.invite("b@x.test", ROLE_ADMIN).await.unwrap();
        assert_eq!(restored.id, ids[1]);
        assert!(!restored.is_deleted);
        assert!(restored.deleted_at.is_none());
        assert_eq!(restored.role, ROLE_ADMIN);
    }
}
