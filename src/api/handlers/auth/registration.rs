//! Registration validation: resolve the slug, cross-check bindings, and
//! verify the supplied token against its per-token secret.
//!
//! The validator is a small state machine with one success state and five
//! terminal failures. Side effects happen on two paths: a user-type mismatch
//! defensively revokes the supplied token (it may be stolen), and an expired
//! token deletes its issued row.

use anyhow::Result;
use jsonwebtoken::errors::ErrorKind;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::claims;
use super::storage::{TokenStore, UserType};

/// Terminal outcomes of registration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegistrationOutcome {
    /// Token verified and bound to this registration; account creation may
    /// proceed.
    Valid,
    /// Unknown slug, or the slug's user type disagrees with the request.
    Unprocessable,
    /// The supplied token has no issued-token row.
    TokenMissing,
    /// The decoded email claim does not match the requested username.
    EmailMismatch,
    /// Signature verification failed with the slug's secret.
    InvalidSignature,
    /// The token expired; its issued row has been deleted.
    Expired,
}

pub struct RegistrationValidator {
    tokens: Arc<dyn TokenStore>,
}

impl RegistrationValidator {
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }

    /// Run the validation state machine for one registration request.
    ///
    /// The email comparison is a case-sensitive exact match against the
    /// request's username.
    pub async fn validate(
        &self,
        slug_id: Uuid,
        user_type: UserType,
        token: &str,
        username: &str,
    ) -> Result<RegistrationOutcome> {
        let Some(pending) = self.tokens.find_pending(slug_id).await? else {
            return Ok(RegistrationOutcome::Unprocessable);
        };

        if pending.user_type != user_type {
            // The token may have been replayed against a different signup;
            // revoke every issued row carrying it before rejecting.
            self.tokens.delete_issued_by_token(token).await?;
            return Ok(RegistrationOutcome::Unprocessable);
        }

        let Some(issued) = self.tokens.find_issued_by_token(token).await? else {
            return Ok(RegistrationOutcome::TokenMissing);
        };

        match claims::decode(&issued.token, pending.jwt_key.as_bytes()) {
            Ok(decoded) => {
                if decoded.email.as_deref() == Some(username) {
                    Ok(RegistrationOutcome::Valid)
                } else {
                    Ok(RegistrationOutcome::EmailMismatch)
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                self.tokens.delete_issued_by_token(&issued.token).await?;
                Ok(RegistrationOutcome::Expired)
            }
            Err(err) => {
                warn!("Registration token failed verification: {err}");
                Ok(RegistrationOutcome::InvalidSignature)
            }
        }
    }

    /// Consume the slug, first-writer-wins: returns true only for the caller
    /// whose delete matched the row.
    pub async fn consume_slug(&self, slug_id: Uuid) -> Result<bool> {
        Ok(self.tokens.delete_pending(slug_id).await? > 0)
    }

    /// Remove the issued-token row once registration completes.
    pub async fn discard_token(&self, token: &str) -> Result<()> {
        self.tokens.delete_issued_by_token(token).await?;
        Ok(())
    }
}
