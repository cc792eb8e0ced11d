//! Access/refresh session pair minting.

use anyhow::{Context, Result};
use chrono::Utc;

use super::claims::{self, Claims, TokenKind, UserDetails};
use super::state::AuthConfig;

/// Locations that earn the long-lived expiry policy.
const LONG_LIVED_LOCATIONS: [&str; 2] = ["device", "mobile_app"];

/// A freshly signed access/refresh pair.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionIssuer {
    config: AuthConfig,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Mint a session pair carrying the same claim bundle in both tokens,
    /// signed with the process-wide secret.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint(&self, details: &UserDetails, long_lived: bool) -> Result<TokenPair> {
        let (access_ttl, refresh_ttl) = self.config.session_ttls(long_lived);
        let now = Utc::now();
        let secret = self.config.jwt_secret();

        let access = Claims::session(details, TokenKind::Access, now, access_ttl);
        let refresh = Claims::session(details, TokenKind::Refresh, now, refresh_ttl);

        Ok(TokenPair {
            access_token: claims::encode(&access, secret).context("failed to sign access token")?,
            refresh_token: claims::encode(&refresh, secret)
                .context("failed to sign refresh token")?,
        })
    }

    /// True when the signin request's `location` selects the long-lived
    /// device policy.
    #[must_use]
    pub fn long_lived_location(location: Option<&str>) -> bool {
        location.is_some_and(|value| LONG_LIVED_LOCATIONS.contains(&value))
    }
}
