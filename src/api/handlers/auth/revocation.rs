//! Token revocation and the bearer-authentication guard.
//!
//! Revocation is blocklist-based: signout records the JTI of both session
//! tokens, and every authenticated request checks the blocklist before any
//! business logic runs. A blocked token stays dead even while its signature
//! and expiry are still valid.

use anyhow::Result;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use super::claims::{self, Claims, TokenKind};
use super::state::AuthConfig;
use super::storage::{BlockedToken, TokenStore};
use super::utils::extract_bearer_token;

/// Why a bearer token was rejected before reaching business logic.
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token revoked")]
    Revoked,
    #[error("Wrong token type")]
    WrongKind,
    #[error("User is not active")]
    Inactive,
    #[error("Something went wrong, Please try again")]
    Internal,
}

impl AuthRejection {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken | Self::Revoked | Self::WrongKind => {
                StatusCode::UNAUTHORIZED
            }
            Self::Inactive => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcome of a signout request.
#[derive(Debug, Eq, PartialEq)]
pub enum RevokeOutcome {
    Revoked,
    /// The supplied refresh token could not be decoded.
    BadRefreshToken,
}

pub struct RevocationGuard {
    tokens: Arc<dyn TokenStore>,
    config: AuthConfig,
}

impl RevocationGuard {
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, config: AuthConfig) -> Self {
        Self { tokens, config }
    }

    /// Blocklist membership test for one JTI.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        self.tokens.is_blocked(jti).await
    }

    /// Revoke a session: decode the refresh token to recover its JTI, then
    /// record both JTIs in one insert sharing a single timestamp.
    pub async fn revoke_session(
        &self,
        access_jti: &str,
        access_kind: TokenKind,
        refresh_token: &str,
    ) -> Result<RevokeOutcome> {
        let Ok(refresh) = claims::decode(refresh_token, self.config.jwt_secret()) else {
            return Ok(RevokeOutcome::BadRefreshToken);
        };

        let now = Utc::now();
        self.tokens
            .block_tokens(vec![
                BlockedToken {
                    jti: access_jti.to_string(),
                    created_at: now,
                    kind: access_kind,
                },
                BlockedToken {
                    jti: refresh.jti,
                    created_at: now,
                    kind: refresh.kind,
                },
            ])
            .await?;
        Ok(RevokeOutcome::Revoked)
    }

    /// Authenticate a bearer token of the expected kind.
    ///
    /// Runs before business logic on every protected route: extract the
    /// bearer token, verify signature/expiry, check the kind, then reject
    /// revoked JTIs regardless of cryptographic validity.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        expected: TokenKind,
    ) -> Result<Claims, AuthRejection> {
        let token = extract_bearer_token(headers).ok_or(AuthRejection::MissingToken)?;
        let claims = claims::decode(&token, self.config.jwt_secret())
            .map_err(|_| AuthRejection::InvalidToken)?;
        if claims.kind != expected {
            return Err(AuthRejection::WrongKind);
        }
        let revoked = self.is_revoked(&claims.jti).await.map_err(|err| {
            error!("Failed to check token revocation: {err}");
            AuthRejection::Internal
        })?;
        if revoked {
            return Err(AuthRejection::Revoked);
        }
        Ok(claims)
    }
}
