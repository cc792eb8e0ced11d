//! Authentication handlers and supporting modules.
//!
//! This module covers the whole identity lifecycle: signup token issuance,
//! registration, credential signin, session refresh, and signout.
//!
//! ## Token model
//!
//! Signup tokens are signed with a random per-token secret stored against a
//! slug, so possession of the registration link alone is not enough; the
//! service must still resolve the slug to verify the token. Session tokens
//! (access/refresh) share one process-wide secret and carry the full identity
//! bundle, letting refresh mint a new pair without touching the user store.
//!
//! ## Revocation
//!
//! Signout records both JTIs of the pair in an append-only blocklist. Every
//! authenticated request consults the blocklist, so a revoked token stays
//! dead for its remaining cryptographic lifetime.

pub(crate) mod claims;
mod issuer;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod profile;
mod rate_limit;
pub(crate) mod refresh;
pub(crate) mod register;
mod registration;
mod revocation;
mod session;
pub(crate) mod signin;
pub(crate) mod signout;
pub(crate) mod signup;
mod state;
pub(crate) mod storage;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};
pub use storage::{
    BlockedToken, IssuedToken, PendingToken, PgTokenStore, PgUserStore, Principal, TokenPurpose,
    TokenStore, UserStatus, UserStore, UserType,
};
