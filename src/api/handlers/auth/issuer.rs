//! Purpose-scoped token issuance.
//!
//! Every issued token gets its own random HMAC secret, persisted with the
//! slug it belongs to. The issued-token row for (email, purpose) is a single
//! slot: re-issuance overwrites the token and advances the rate-limit attempt
//! counter in one atomic store operation.

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::claims::{self, Claims};
use super::state::AuthConfig;
use super::storage::{PendingToken, TokenPurpose, TokenStore, UserType};
use super::utils::{generate_token_secret, valid_email};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A freshly minted token and the slug that anchors its secret.
#[derive(Debug)]
pub struct IssuedSignup {
    pub token: String,
    pub slug_id: Uuid,
    pub attempt: i32,
}

pub struct TokenIssuer {
    tokens: Arc<dyn TokenStore>,
    config: AuthConfig,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, config: AuthConfig) -> Self {
        Self { tokens, config }
    }

    /// Mint a short-lived purpose token for `email` and persist both the
    /// issued-token slot and the pending slug record.
    ///
    /// # Errors
    /// `InvalidEmail` when the address fails the configured pattern;
    /// `Internal` on store or signing failure.
    pub async fn issue(
        &self,
        email: &str,
        user_type: UserType,
        purpose: TokenPurpose,
    ) -> Result<IssuedSignup, IssueError> {
        if !valid_email(email, self.config.email_regex()) {
            return Err(IssueError::InvalidEmail);
        }

        let secret = generate_token_secret()?;
        let slug_id = Uuid::new_v4();
        let now = Utc::now();

        let claims = Claims::purpose_token(email, now, self.config.signup_token_ttl());
        let token =
            claims::encode(&claims, secret.as_bytes()).context("failed to sign purpose token")?;

        // The attempt counter is monotonic-with-wraparound; successful
        // issuance never resets it.
        let attempt = self
            .tokens
            .record_issued(email, purpose, &token, now, self.config.max_attempts())
            .await?;

        self.tokens
            .insert_pending(PendingToken {
                slug_id,
                jwt_key: secret,
                user_type,
            })
            .await?;

        Ok(IssuedSignup {
            token,
            slug_id,
            attempt,
        })
    }
}
