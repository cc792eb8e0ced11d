//! In-memory store backends for tests and local development.
//!
//! These mirror the Postgres semantics exactly, including the atomic
//! attempt-counter wraparound and the conflict-tolerant blocklist insert, so
//! the component tests exercise the same state transitions the real store
//! sees.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::storage::{
    BlockedToken, IssuedToken, PendingToken, Principal, TokenPurpose, TokenStore, UserStore,
    UserType,
};

#[derive(Default)]
pub struct MemoryTokenStore {
    pending: Mutex<Vec<PendingToken>>,
    issued: Mutex<Vec<IssuedToken>>,
    blocked: Mutex<Vec<BlockedToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the issued-token rows, for state assertions in tests.
    pub async fn issued_rows(&self) -> Vec<IssuedToken> {
        self.issued.lock().await.clone()
    }

    /// Snapshot of the pending-token rows.
    pub async fn pending_rows(&self) -> Vec<PendingToken> {
        self.pending.lock().await.clone()
    }

    /// Backdate the assignment time of an (email, purpose) row, used to test
    /// rate-limit window expiry.
    pub async fn backdate_issued(
        &self,
        email: &str,
        purpose: TokenPurpose,
        assigned_time: DateTime<Utc>,
    ) {
        let mut rows = self.issued.lock().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.email == email && row.purpose == purpose)
        {
            row.assigned_time = Some(assigned_time);
        }
    }

    /// Insert a raw issued row, used to model legacy partially-populated rows.
    pub async fn seed_issued(&self, row: IssuedToken) {
        self.issued.lock().await.push(row);
    }

    /// Snapshot of the blocklist rows.
    pub async fn blocked_rows(&self) -> Vec<BlockedToken> {
        self.blocked.lock().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert_pending(&self, pending: PendingToken) -> Result<()> {
        self.pending.lock().await.push(pending);
        Ok(())
    }

    async fn find_pending(&self, slug_id: Uuid) -> Result<Option<PendingToken>> {
        let rows = self.pending.lock().await;
        Ok(rows.iter().find(|row| row.slug_id == slug_id).cloned())
    }

    async fn delete_pending(&self, slug_id: Uuid) -> Result<u64> {
        let mut rows = self.pending.lock().await;
        let before = rows.len();
        rows.retain(|row| row.slug_id != slug_id);
        Ok((before - rows.len()) as u64)
    }

    async fn find_issued(&self, email: &str, purpose: TokenPurpose) -> Result<Option<IssuedToken>> {
        let rows = self.issued.lock().await;
        Ok(rows
            .iter()
            .find(|row| row.email == email && row.purpose == purpose)
            .cloned())
    }

    async fn find_issued_by_token(&self, token: &str) -> Result<Option<IssuedToken>> {
        let rows = self.issued.lock().await;
        Ok(rows.iter().find(|row| row.token == token).cloned())
    }

    async fn record_issued(
        &self,
        email: &str,
        purpose: TokenPurpose,
        token: &str,
        assigned_time: DateTime<Utc>,
        max_attempt: i32,
    ) -> Result<i32> {
        let mut rows = self.issued.lock().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.email == email && row.purpose == purpose)
        {
            let previous = row.attempt.unwrap_or(0);
            let attempt = if previous >= max_attempt { 1 } else { previous + 1 };
            row.token = token.to_string();
            row.assigned_time = Some(assigned_time);
            row.attempt = Some(attempt);
            return Ok(attempt);
        }
        rows.push(IssuedToken {
            token: token.to_string(),
            email: email.to_string(),
            purpose,
            assigned_time: Some(assigned_time),
            attempt: Some(1),
        });
        Ok(1)
    }

    async fn delete_issued_by_token(&self, token: &str) -> Result<u64> {
        let mut rows = self.issued.lock().await;
        let before = rows.len();
        rows.retain(|row| row.token != token);
        Ok((before - rows.len()) as u64)
    }

    async fn block_tokens(&self, entries: Vec<BlockedToken>) -> Result<()> {
        // Single lock acquisition; both JTIs become visible together. An
        // already blocked JTI keeps its original row.
        let mut rows = self.blocked.lock().await;
        for entry in entries {
            if !rows.iter().any(|row| row.jti == entry.jti) {
                rows.push(entry);
            }
        }
        Ok(())
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool> {
        let rows = self.blocked.lock().await;
        Ok(rows.iter().any(|row| row.jti == jti))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<Principal>>,
    groups: Mutex<HashMap<String, (Uuid, UserType)>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn group_for(&self, username: &str) -> Option<(Uuid, UserType)> {
        self.groups.lock().await.get(username).copied()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|user| user.username == username || user.username == username.to_lowercase())
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Principal>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|user| user.user_id == user_id).cloned())
    }

    async fn insert_principal(&self, principal: Principal) -> Result<()> {
        self.users.lock().await.push(principal);
        Ok(())
    }

    async fn upsert_group(&self, username: &str, user_id: Uuid, user_type: UserType) -> Result<()> {
        self.groups
            .lock()
            .await
            .insert(username.to_string(), (user_id, user_type));
        Ok(())
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Principal>> {
        let needle = term.to_lowercase();
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|user| {
                user.username.to_lowercase().contains(&needle)
                    || user.firstname.to_lowercase().contains(&needle)
                    || user.lastname.to_lowercase().contains(&needle)
            })
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::claims::TokenKind;

    #[tokio::test]
    async fn record_issued_increments_and_wraps() -> Result<()> {
        let store = MemoryTokenStore::new();
        for expected in 1..=5 {
            let attempt = store
                .record_issued("a@b.com", TokenPurpose::Signup, "t", Utc::now(), 5)
                .await?;
            assert_eq!(attempt, expected);
        }
        // Sixth issuance wraps back to 1.
        let attempt = store
            .record_issued("a@b.com", TokenPurpose::Signup, "t", Utc::now(), 5)
            .await?;
        assert_eq!(attempt, 1);
        Ok(())
    }

    #[tokio::test]
    async fn record_issued_overwrites_single_row() -> Result<()> {
        let store = MemoryTokenStore::new();
        store
            .record_issued("a@b.com", TokenPurpose::Signup, "first", Utc::now(), 5)
            .await?;
        store
            .record_issued("a@b.com", TokenPurpose::Signup, "second", Utc::now(), 5)
            .await?;
        let rows = store.issued_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "second");
        assert_eq!(rows[0].attempt, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn delete_pending_reports_matched_count() -> Result<()> {
        let store = MemoryTokenStore::new();
        let slug = Uuid::new_v4();
        store
            .insert_pending(PendingToken {
                slug_id: slug,
                jwt_key: "secret".to_string(),
                user_type: UserType::Customer,
            })
            .await?;
        assert_eq!(store.delete_pending(slug).await?, 1);
        assert_eq!(store.delete_pending(slug).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn block_tokens_inserts_all_entries() -> Result<()> {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store
            .block_tokens(vec![
                BlockedToken {
                    jti: "a".to_string(),
                    created_at: now,
                    kind: TokenKind::Access,
                },
                BlockedToken {
                    jti: "r".to_string(),
                    created_at: now,
                    kind: TokenKind::Refresh,
                },
            ])
            .await?;
        assert!(store.is_blocked("a").await?);
        assert!(store.is_blocked("r").await?);
        assert!(!store.is_blocked("x").await?);
        Ok(())
    }

    #[tokio::test]
    async fn block_tokens_keeps_first_row_for_duplicate_jti() -> Result<()> {
        let store = MemoryTokenStore::new();
        let first = Utc::now();
        store
            .block_tokens(vec![BlockedToken {
                jti: "r".to_string(),
                created_at: first,
                kind: TokenKind::Refresh,
            }])
            .await?;
        // Re-blocking the same JTI alongside a fresh one blocks the fresh
        // one and leaves the existing row untouched.
        store
            .block_tokens(vec![
                BlockedToken {
                    jti: "a".to_string(),
                    created_at: Utc::now(),
                    kind: TokenKind::Access,
                },
                BlockedToken {
                    jti: "r".to_string(),
                    created_at: Utc::now(),
                    kind: TokenKind::Refresh,
                },
            ])
            .await?;
        assert!(store.is_blocked("a").await?);
        assert!(store.is_blocked("r").await?);
        let rows = store.blocked_rows().await;
        assert_eq!(rows.len(), 2);
        let kept = rows.iter().find(|row| row.jti == "r").expect("kept row");
        assert_eq!(kept.created_at, first);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_username_matches_lowercase_form() -> Result<()> {
        let store = MemoryUserStore::new();
        store
            .insert_principal(Principal {
                user_id: Uuid::new_v4(),
                username: "alice@example.com".to_string(),
                firstname: "Alice".to_string(),
                lastname: "Smith".to_string(),
                password_hash: String::new(),
                status: super::super::storage::UserStatus::Active,
                user_type: UserType::Customer,
                timezone: "UTC".to_string(),
                phone_number: String::new(),
                country_code: String::new(),
                language_preference: "en".to_string(),
            })
            .await?;
        assert!(store.find_by_username("Alice@Example.com").await?.is_some());
        assert!(store.find_by_username("bob@example.com").await?.is_none());
        Ok(())
    }
}
