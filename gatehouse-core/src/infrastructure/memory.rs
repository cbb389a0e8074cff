//! In-memory repository implementations.
//!
//! Reference stores used by the test suite and by hosts that don't need
//! durability. They carry the same guarantees the ports demand of any real
//! store: email uniqueness is checked and inserted under one writer lock,
//! and reset-token redemption is a single conditional remove, so concurrent
//! redeemers are linearized.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::email::EmailAddress;
use crate::domain::repositories::{
    RepositoryError, ResetTokenRepository, SessionRepository, UserRepository,
};
use crate::domain::user::{ProfileUpdate, User};
use crate::session::Session;
use crate::token::reset::ResetTokenRecord;

#[derive(Debug, Default)]
struct UserTable {
    by_id: HashMap<Uuid, User>,
    id_by_email: HashMap<String, Uuid>,
}

/// Credential store backed by a writer-locked pair of maps.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<T>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut User) -> T,
    ) -> Result<T, RepositoryError> {
        let mut table = self.table.write().unwrap();
        let user = table.by_id.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let result = apply(user);
        user.updated_at = Utc::now();
        Ok(result)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut table = self.table.write().unwrap();

        // Uniqueness check and insert happen under the same writer lock, so
        // two concurrent registrations of one address cannot both pass.
        let email_key = user.email.as_str().to_owned();
        if table.id_by_email.contains_key(&email_key) {
            return Err(RepositoryError::EmailExists);
        }

        table.id_by_email.insert(email_key, user.id);
        table.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.table.read().unwrap().by_id.get(&id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().unwrap();
        Ok(table
            .id_by_email
            .get(email.as_str())
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let mut table = self.table.write().unwrap();

        if let Some(new_email) = update.email.as_ref() {
            match table.id_by_email.get(new_email.as_str()) {
                Some(owner) if *owner != id => return Err(RepositoryError::EmailExists),
                _ => {}
            }
        }

        let user = table.by_id.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let old_email = user.email.as_str().to_owned();

        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(first_name) = update.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar);
        }
        user.updated_at = Utc::now();

        let updated = user.clone();
        if updated.email.as_str() != old_email {
            table.id_by_email.remove(&old_email);
            table
                .id_by_email
                .insert(updated.email.as_str().to_owned(), id);
        }
        Ok(updated)
    }

    async fn verify_email(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.with_user(id, |user| {
            // Idempotent: the first verification timestamp sticks.
            if user.email_verified_at.is_none() {
                user.email_verified_at = Some(Utc::now());
            }
        })
    }

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.with_user(id, |user| {
            user.password_hash = password_hash.to_owned();
        })
    }

    async fn rotate_remember_token(
        &self,
        id: Uuid,
        token_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.with_user(id, |user| {
            user.remember_token = Some(token_hash.to_owned());
        })
    }
}

/// Session store keyed by token hash.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: Session) -> Result<(), RepositoryError> {
        self.sessions.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.get(token_hash).map(|entry| entry.value().clone()))
    }

    async fn remove_by_hash(&self, token_hash: &str) -> Result<(), RepositoryError> {
        self.sessions.remove(token_hash);
        Ok(())
    }

    async fn revoke_for_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            if session.user_id == user_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

/// Reset-token store keyed by email; one live record per address.
#[derive(Debug, Default)]
pub struct InMemoryResetTokenRepository {
    records: DashMap<String, ResetTokenRecord>,
}

impl InMemoryResetTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResetTokenRepository for InMemoryResetTokenRepository {
    async fn put(&self, record: ResetTokenRecord) -> Result<(), RepositoryError> {
        // Insert replaces any prior record for the address, invalidating
        // earlier outstanding tokens.
        self.records
            .insert(record.email.as_str().to_owned(), record);
        Ok(())
    }

    async fn consume(
        &self,
        email: &EmailAddress,
        token_hash: &str,
    ) -> Result<Option<ResetTokenRecord>, RepositoryError> {
        // remove_if is the atomic fetch-and-invalidate: the predicate runs
        // under the shard lock, so of N concurrent redeemers exactly one
        // gets the record and the rest see None. A wrong hash leaves the
        // record untouched. Hashes are compared in constant time.
        Ok(self
            .records
            .remove_if(email.as_str(), |_, record| {
                let stored = record.token_hash.as_bytes();
                let presented = token_hash.as_bytes();
                stored.len() == presented.len() && constant_time_eq(stored, presented)
            })
            .map(|(_, record)| record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::reset::ResetToken;
    use chrono::Duration;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::register(
            EmailAddress::new(email).unwrap(),
            "Alice".into(),
            "digest".into(),
        )
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("a@x.com")).await.unwrap();

        assert!(matches!(
            repo.create(user("a@x.com")).await,
            Err(RepositoryError::EmailExists)
        ));
    }

    #[tokio::test]
    async fn concurrent_registration_of_one_address_admits_exactly_one() {
        let repo = Arc::new(InMemoryUserRepository::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.create(user("race@x.com")).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn verify_email_is_idempotent() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(user("a@x.com")).await.unwrap();

        repo.verify_email(created.id).await.unwrap();
        let first = repo
            .find_by_id(created.id)
            .await
            .unwrap()
            .unwrap()
            .email_verified_at
            .unwrap();

        repo.verify_email(created.id).await.unwrap();
        let second = repo
            .find_by_id(created.id)
            .await
            .unwrap()
            .unwrap()
            .email_verified_at
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn profile_email_change_rechecks_uniqueness() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.create(user("a@x.com")).await.unwrap();
        repo.create(user("b@x.com")).await.unwrap();

        let taken = ProfileUpdate {
            email: Some(EmailAddress::new("b@x.com").unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_profile(alice.id, taken).await,
            Err(RepositoryError::EmailExists)
        ));

        let update = ProfileUpdate {
            email: Some(EmailAddress::new("c@x.com").unwrap()),
            ..Default::default()
        };
        repo.update_profile(alice.id, update).await.unwrap();

        let by_new = repo
            .find_by_email(&EmailAddress::new("c@x.com").unwrap())
            .await
            .unwrap();
        assert_eq!(by_new.unwrap().id, alice.id);
        let by_old = repo
            .find_by_email(&EmailAddress::new("a@x.com").unwrap())
            .await
            .unwrap();
        assert!(by_old.is_none());
    }

    #[tokio::test]
    async fn revoking_sessions_counts_only_that_user() {
        let repo = InMemorySessionRepository::new();
        let target = Uuid::now_v7();
        let other = Uuid::now_v7();

        for i in 0..3 {
            repo.insert(Session::new(
                target,
                format!("target-{i}"),
                false,
                Duration::hours(1),
            ))
            .await
            .unwrap();
        }
        repo.insert(Session::new(other, "other".into(), false, Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(repo.revoke_for_user(target).await.unwrap(), 3);
        assert!(repo.find_by_hash("target-0").await.unwrap().is_none());
        assert!(repo.find_by_hash("other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_consume_is_single_use() {
        let repo = InMemoryResetTokenRepository::new();
        let email = EmailAddress::new("a@x.com").unwrap();
        let token = ResetToken::generate(Duration::hours(1)).unwrap();
        repo.put(ResetTokenRecord::new(email.clone(), "hash".into(), &token))
            .await
            .unwrap();

        assert!(repo.consume(&email, "wrong").await.unwrap().is_none());
        assert!(repo.consume(&email, "hush").await.unwrap().is_none());
        assert!(repo.consume(&email, "hash").await.unwrap().is_some());
        assert!(repo.consume(&email, "hash").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn issuing_replaces_the_outstanding_token() {
        let repo = InMemoryResetTokenRepository::new();
        let email = EmailAddress::new("a@x.com").unwrap();
        let token = ResetToken::generate(Duration::hours(1)).unwrap();

        repo.put(ResetTokenRecord::new(email.clone(), "first".into(), &token))
            .await
            .unwrap();
        repo.put(ResetTokenRecord::new(email.clone(), "second".into(), &token))
            .await
            .unwrap();

        assert!(repo.consume(&email, "first").await.unwrap().is_none());
        assert!(repo.consume(&email, "second").await.unwrap().is_some());
    }
}
