//! Token and principal persistence: capability traits plus Postgres backends.
//!
//! Three logical tables back the token lifecycle:
//!
//! - `pending_tokens`: slug → per-token signing secret + user type, consumed
//!   exactly once on registration.
//! - `issued_tokens`: one row per (email, purpose) carrying the latest token,
//!   its assignment time, and the rate-limit attempt counter.
//! - `blocked_tokens`: append-only revocation list keyed by JTI.
//!
//! The principal store is a separate capability; this service reads and
//! writes users through it but does not own their schema.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::claims::TokenKind;

/// Use-case a short-lived token was minted for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Signup,
    #[serde(rename = "2FA")]
    TwoFactor,
    DeleteAccount,
}

impl TokenPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::TwoFactor => "2FA",
            Self::DeleteAccount => "delete_account",
        }
    }

}

impl FromStr for TokenPurpose {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "signup" => Ok(Self::Signup),
            "2FA" => Ok(Self::TwoFactor),
            "delete_account" => Ok(Self::DeleteAccount),
            other => Err(anyhow!("unknown token purpose: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Customer,
    Installer,
    Admin,
}

impl UserType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Installer => "installer",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "customer" => Ok(Self::Customer),
            "installer" => Ok(Self::Installer),
            "admin" => Ok(Self::Admin),
            other => Err(anyhow!("unknown user type: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(anyhow!("unknown user status: {other}")),
        }
    }
}

/// A pending registration: the slug binds the signup link to the random
/// per-token secret that validates its token. Single-use, never updated.
#[derive(Clone, Debug)]
pub struct PendingToken {
    pub slug_id: Uuid,
    pub jwt_key: String,
    pub user_type: UserType,
}

/// Latest issued token for an (email, purpose) pair. Re-issuance overwrites
/// the row in place; `attempt` wraps back to 1 past the rate-limit maximum.
///
/// `assigned_time` and `attempt` are nullable to tolerate legacy rows that
/// predate the counter.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub email: String,
    pub purpose: TokenPurpose,
    pub assigned_time: Option<DateTime<Utc>>,
    pub attempt: Option<i32>,
}

/// Append-only blocklist entry. Once a JTI lands here the token instance is
/// dead even while cryptographically valid.
#[derive(Clone, Debug)]
pub struct BlockedToken {
    pub jti: String,
    pub created_at: DateTime<Utc>,
    pub kind: TokenKind,
}

/// An account as seen through the principal-store capability.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub user_type: UserType,
    pub timezone: String,
    pub phone_number: String,
    pub country_code: String,
    pub language_preference: String,
}

/// Persistence capability for the three token tables.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_pending(&self, pending: PendingToken) -> Result<()>;
    async fn find_pending(&self, slug_id: Uuid) -> Result<Option<PendingToken>>;
    /// Delete the slug row, returning how many rows matched. Callers use the
    /// count to make slug consumption first-writer-wins under double submit.
    async fn delete_pending(&self, slug_id: Uuid) -> Result<u64>;

    async fn find_issued(&self, email: &str, purpose: TokenPurpose) -> Result<Option<IssuedToken>>;
    async fn find_issued_by_token(&self, token: &str) -> Result<Option<IssuedToken>>;
    /// Atomically insert-or-overwrite the (email, purpose) row and advance
    /// the attempt counter, wrapping to 1 past `max_attempt`. Returns the new
    /// counter value.
    async fn record_issued(
        &self,
        email: &str,
        purpose: TokenPurpose,
        token: &str,
        assigned_time: DateTime<Utc>,
        max_attempt: i32,
    ) -> Result<i32>;
    async fn delete_issued_by_token(&self, token: &str) -> Result<u64>;

    /// Insert all entries as one statement so a concurrent reader never
    /// observes a half-revoked session.
    async fn block_tokens(&self, entries: Vec<BlockedToken>) -> Result<()>;
    async fn is_blocked(&self, jti: &str) -> Result<bool>;
}

/// Capability the auth core requires from the external user store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lookup by exact username or its lowercase form.
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Principal>>;
    async fn insert_principal(&self, principal: Principal) -> Result<()>;
    async fn upsert_group(&self, username: &str, user_id: Uuid, user_type: UserType) -> Result<()>;
    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Principal>>;
}

/// Postgres-backed token store.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert_pending(&self, pending: PendingToken) -> Result<()> {
        let query = r"
            INSERT INTO pending_tokens (slug_id, jwt_key, user_type)
            VALUES ($1, $2, $3)
        ";
        sqlx::query(query)
            .bind(pending.slug_id)
            .bind(&pending.jwt_key)
            .bind(pending.user_type.as_str())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert pending token")?;
        Ok(())
    }

    async fn find_pending(&self, slug_id: Uuid) -> Result<Option<PendingToken>> {
        let query = r"
            SELECT slug_id, jwt_key, user_type
            FROM pending_tokens
            WHERE slug_id = $1
        ";
        let row = sqlx::query(query)
            .bind(slug_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup pending token")?;

        row.map(|row| {
            Ok(PendingToken {
                slug_id: row.get("slug_id"),
                jwt_key: row.get("jwt_key"),
                user_type: row.get::<String, _>("user_type").parse()?,
            })
        })
        .transpose()
    }

    async fn delete_pending(&self, slug_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM pending_tokens WHERE slug_id = $1";
        let result = sqlx::query(query)
            .bind(slug_id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete pending token")?;
        Ok(result.rows_affected())
    }

    async fn find_issued(&self, email: &str, purpose: TokenPurpose) -> Result<Option<IssuedToken>> {
        let query = r"
            SELECT token, email, purpose, assigned_time, attempt
            FROM issued_tokens
            WHERE email = $1 AND purpose = $2
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup issued token")?;
        row.map(issued_from_row).transpose()
    }

    async fn find_issued_by_token(&self, token: &str) -> Result<Option<IssuedToken>> {
        let query = r"
            SELECT token, email, purpose, assigned_time, attempt
            FROM issued_tokens
            WHERE token = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup issued token by value")?;
        row.map(issued_from_row).transpose()
    }

    async fn record_issued(
        &self,
        email: &str,
        purpose: TokenPurpose,
        token: &str,
        assigned_time: DateTime<Utc>,
        max_attempt: i32,
    ) -> Result<i32> {
        // Single upsert keeps the check-then-act window closed: concurrent
        // issuance for the same pair serializes on the unique key.
        let query = r"
            INSERT INTO issued_tokens (email, purpose, token, assigned_time, attempt)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (email, purpose) DO UPDATE
            SET token = EXCLUDED.token,
                assigned_time = EXCLUDED.assigned_time,
                attempt = CASE
                    WHEN COALESCE(issued_tokens.attempt, 0) >= $5 THEN 1
                    ELSE COALESCE(issued_tokens.attempt, 0) + 1
                END
            RETURNING attempt
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(purpose.as_str())
            .bind(token)
            .bind(assigned_time)
            .bind(max_attempt)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to record issued token")?;
        Ok(row.get("attempt"))
    }

    async fn delete_issued_by_token(&self, token: &str) -> Result<u64> {
        let query = "DELETE FROM issued_tokens WHERE token = $1";
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete issued token")?;
        Ok(result.rows_affected())
    }

    async fn block_tokens(&self, entries: Vec<BlockedToken>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        // One multi-row insert; both JTIs of a pair land atomically. A JTI
        // that is already on the blocklist keeps its original row.
        let query = r"
            INSERT INTO blocked_tokens (jti, created_at, kind)
            SELECT * FROM UNNEST($1::text[], $2::timestamptz[], $3::text[])
            ON CONFLICT (jti) DO NOTHING
        ";
        let jtis: Vec<String> = entries.iter().map(|entry| entry.jti.clone()).collect();
        let created: Vec<DateTime<Utc>> = entries.iter().map(|entry| entry.created_at).collect();
        let kinds: Vec<String> = entries
            .iter()
            .map(|entry| entry.kind.as_str().to_string())
            .collect();
        sqlx::query(query)
            .bind(&jtis)
            .bind(&created)
            .bind(&kinds)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert blocked tokens")?;
        Ok(())
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool> {
        let query = "SELECT 1 FROM blocked_tokens WHERE jti = $1 LIMIT 1";
        let row = sqlx::query(query)
            .bind(jti)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to check blocked token")?;
        Ok(row.is_some())
    }
}

fn issued_from_row(row: sqlx::postgres::PgRow) -> Result<IssuedToken> {
    Ok(IssuedToken {
        token: row.get("token"),
        email: row.get("email"),
        purpose: row.get::<String, _>("purpose").parse()?,
        assigned_time: row.get("assigned_time"),
        attempt: row.get("attempt"),
    })
}

/// Postgres-backed principal store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn principal_from_row(row: &sqlx::postgres::PgRow) -> Result<Principal> {
    Ok(Principal {
        user_id: row.get("user_id"),
        username: row.get("username"),
        firstname: row.get("firstname"),
        lastname: row.get("lastname"),
        password_hash: row.get("password_hash"),
        status: row.get::<String, _>("status").parse()?,
        user_type: row.get::<String, _>("user_type").parse()?,
        timezone: row.get("timezone"),
        phone_number: row.get("phone_number"),
        country_code: row.get("country_code"),
        language_preference: row.get("language_preference"),
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let query = r"
            SELECT
                users.user_id, users.username, users.firstname, users.lastname,
                users.password_hash, users.status, users.timezone, users.phone_number,
                users.country_code, users.language_preference,
                COALESCE(user_groups.user_type, 'customer') AS user_type
            FROM users
            LEFT JOIN user_groups ON user_groups.user_id = users.user_id
            WHERE users.username = $1 OR users.username = lower($1)
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user by username")?;
        row.as_ref().map(principal_from_row).transpose()
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Principal>> {
        let query = r"
            SELECT
                users.user_id, users.username, users.firstname, users.lastname,
                users.password_hash, users.status, users.timezone, users.phone_number,
                users.country_code, users.language_preference,
                COALESCE(user_groups.user_type, 'customer') AS user_type
            FROM users
            LEFT JOIN user_groups ON user_groups.user_id = users.user_id
            WHERE users.user_id = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(principal_from_row).transpose()
    }

    async fn insert_principal(&self, principal: Principal) -> Result<()> {
        let query = r"
            INSERT INTO users
                (user_id, username, firstname, lastname, password_hash, status,
                 timezone, phone_number, country_code, language_preference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ";
        sqlx::query(query)
            .bind(principal.user_id)
            .bind(&principal.username)
            .bind(&principal.firstname)
            .bind(&principal.lastname)
            .bind(&principal.password_hash)
            .bind(principal.status.as_str())
            .bind(&principal.timezone)
            .bind(&principal.phone_number)
            .bind(&principal.country_code)
            .bind(&principal.language_preference)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert principal")?;
        Ok(())
    }

    async fn upsert_group(&self, username: &str, user_id: Uuid, user_type: UserType) -> Result<()> {
        let query = r"
            INSERT INTO user_groups (user_id, username, user_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                user_type = EXCLUDED.user_type
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(username)
            .bind(user_type.as_str())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to upsert user group")?;
        Ok(())
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Principal>> {
        let query = r"
            SELECT
                users.user_id, users.username, users.firstname, users.lastname,
                users.password_hash, users.status, users.timezone, users.phone_number,
                users.country_code, users.language_preference,
                COALESCE(user_groups.user_type, 'customer') AS user_type
            FROM users
            LEFT JOIN user_groups ON user_groups.user_id = users.user_id
            WHERE users.username ILIKE '%' || $1 || '%'
               OR users.firstname ILIKE '%' || $1 || '%'
               OR users.lastname ILIKE '%' || $1 || '%'
            ORDER BY users.username
            LIMIT $2
        ";
        let rows = sqlx::query(query)
            .bind(term)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to search users")?;
        rows.iter().map(principal_from_row).collect()
    }
}
