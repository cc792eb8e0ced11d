//! Auth configuration and shared request state.

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::issuer::TokenIssuer;
use super::rate_limit::RateLimiter;
use super::registration::RegistrationValidator;
use super::revocation::RevocationGuard;
use super::session::SessionIssuer;
use super::storage::{TokenStore, UserStore};

const DEFAULT_SIGNUP_TOKEN_TTL_MINUTES: i64 = 10;
const DEFAULT_ACCESS_TTL_SHORT_MINUTES: i64 = 10;
const DEFAULT_REFRESH_TTL_SHORT_MINUTES: i64 = 12;
const DEFAULT_ACCESS_TTL_LONG_HOURS: i64 = 12;
const DEFAULT_REFRESH_TTL_LONG_HOURS: i64 = 14;
const DEFAULT_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_RATE_LIMIT_WINDOW_MINUTES: i64 = 60;
const DEFAULT_EMAIL_REGEX: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
// Shape only; character-class requirements are enforced programmatically.
const DEFAULT_PASSWORD_REGEX: &str = r"^[\x21-\x7e]{8,64}$";

#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    base_url: String,
    email_regex: String,
    password_regex: String,
    signup_token_ttl: Duration,
    access_ttl_short: Duration,
    refresh_ttl_short: Duration,
    access_ttl_long: Duration,
    refresh_ttl_long: Duration,
    max_attempts: i32,
    rate_limit_window: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString, base_url: String) -> Self {
        Self {
            jwt_secret,
            base_url,
            email_regex: DEFAULT_EMAIL_REGEX.to_string(),
            password_regex: DEFAULT_PASSWORD_REGEX.to_string(),
            signup_token_ttl: Duration::minutes(DEFAULT_SIGNUP_TOKEN_TTL_MINUTES),
            access_ttl_short: Duration::minutes(DEFAULT_ACCESS_TTL_SHORT_MINUTES),
            refresh_ttl_short: Duration::minutes(DEFAULT_REFRESH_TTL_SHORT_MINUTES),
            access_ttl_long: Duration::hours(DEFAULT_ACCESS_TTL_LONG_HOURS),
            refresh_ttl_long: Duration::hours(DEFAULT_REFRESH_TTL_LONG_HOURS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_window: Duration::minutes(DEFAULT_RATE_LIMIT_WINDOW_MINUTES),
        }
    }

    #[must_use]
    pub fn with_email_regex(mut self, pattern: String) -> Self {
        self.email_regex = pattern;
        self
    }

    #[must_use]
    pub fn with_password_regex(mut self, pattern: String) -> Self {
        self.password_regex = pattern;
        self
    }

    #[must_use]
    pub fn with_signup_token_ttl(mut self, ttl: Duration) -> Self {
        self.signup_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn with_session_ttls(
        mut self,
        access_short: Duration,
        refresh_short: Duration,
        access_long: Duration,
        refresh_long: Duration,
    ) -> Self {
        self.access_ttl_short = access_short;
        self.refresh_ttl_short = refresh_short;
        self.access_ttl_long = access_long;
        self.refresh_ttl_long = refresh_long;
        self
    }

    pub(super) fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Registration link returned by the signup endpoint.
    pub(super) fn register_url(&self) -> String {
        format!("{}/register", self.base_url.trim_end_matches('/'))
    }

    pub(super) fn email_regex(&self) -> &str {
        &self.email_regex
    }

    pub(super) fn password_regex(&self) -> &str {
        &self.password_regex
    }

    pub(super) fn signup_token_ttl(&self) -> Duration {
        self.signup_token_ttl
    }

    pub(super) fn session_ttls(&self, long_lived: bool) -> (Duration, Duration) {
        if long_lived {
            (self.access_ttl_long, self.refresh_ttl_long)
        } else {
            (self.access_ttl_short, self.refresh_ttl_short)
        }
    }

    pub(super) fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    pub(super) fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }
}

/// Everything a request handler needs: config, store handles, and the auth
/// components constructed over them. No ambient globals; this is injected via
/// an axum `Extension`.
pub struct AuthState {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    issuer: TokenIssuer,
    rate_limiter: RateLimiter,
    registration: RegistrationValidator,
    sessions: SessionIssuer,
    revocation: RevocationGuard,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: Arc<dyn TokenStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            issuer: TokenIssuer::new(Arc::clone(&tokens), config.clone()),
            rate_limiter: RateLimiter::new(Arc::clone(&tokens), config.clone()),
            registration: RegistrationValidator::new(Arc::clone(&tokens)),
            sessions: SessionIssuer::new(config.clone()),
            revocation: RevocationGuard::new(tokens, config.clone()),
            users,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub(crate) fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub(crate) fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub(crate) fn registration(&self) -> &RegistrationValidator {
        &self.registration
    }

    pub(crate) fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    pub(crate) fn revocation(&self) -> &RevocationGuard {
        &self.revocation
    }
}
