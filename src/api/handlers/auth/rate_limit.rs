//! Issuance rate limiting backed by the issued-token attempt counter.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use super::state::AuthConfig;
use super::storage::{TokenPurpose, TokenStore};

pub struct RateLimiter {
    tokens: Arc<dyn TokenStore>,
    config: AuthConfig,
}

impl RateLimiter {
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, config: AuthConfig) -> Self {
        Self { tokens, config }
    }

    /// Limited iff the (email, purpose) row has reached the attempt maximum
    /// and its assignment still falls inside the rolling window.
    ///
    /// Rows missing `assigned_time` or `attempt` (legacy shapes) are never
    /// limited.
    pub async fn is_limited(&self, email: &str, purpose: TokenPurpose) -> Result<bool> {
        let Some(row) = self.tokens.find_issued(email, purpose).await? else {
            return Ok(false);
        };
        let (Some(assigned_time), Some(attempt)) = (row.assigned_time, row.attempt) else {
            return Ok(false);
        };
        if attempt == 0 {
            return Ok(false);
        }
        let window_end = assigned_time + self.config.rate_limit_window();
        Ok(Utc::now() <= window_end && attempt >= self.config.max_attempts())
    }
}
