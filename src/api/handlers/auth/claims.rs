//! JWT claim construction and HS256 encode/decode.
//!
//! Two classes of tokens share this claim layout:
//!
//! - Purpose tokens (signup, 2FA, delete-account) are signed with a random
//!   per-token secret that lives next to the pending slug, so a leaked
//!   process key never validates a stale registration.
//! - Session tokens (access/refresh) are signed with the process-wide secret
//!   and embed the full claim bundle, so a refresh can mint a new pair
//!   without a database round-trip.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::Error as JwtError,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::storage::UserType;

/// Discriminates access from refresh tokens via the `type` claim.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Identity payload embedded in session tokens (the claim bundle).
///
/// Both tokens of a pair carry the same bundle so the refresh endpoint can
/// rebuild an access token from the refresh token alone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserDetails {
    pub user_id: String,
    pub username: String,
    pub user_type: UserType,
}

/// Registered and custom claims carried by every token this service signs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub fresh: bool,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_details: Option<UserDetails>,
}

impl Claims {
    /// Claims for a short-lived purpose token (signup, 2FA, delete-account).
    ///
    /// Purpose tokens embed the email and a placeholder identity marker; the
    /// purpose itself lives in the issued-token row, not the claims.
    #[must_use]
    pub fn purpose_token(email: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            fresh: false,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Access,
            sub: email.to_string(),
            email: Some(email.to_string()),
            id: Some("0".to_string()),
            user_details: None,
        }
    }

    /// Claims for one half of an access/refresh session pair.
    #[must_use]
    pub fn session(details: &UserDetails, kind: TokenKind, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            fresh: false,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
            sub: details.user_id.clone(),
            email: None,
            id: None,
            user_details: Some(details.clone()),
        }
    }
}

/// Sign claims with HMAC-SHA256.
pub fn encode(claims: &Claims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Decode and validate a token: signature, expiry, and not-before.
pub fn decode(token: &str, secret: &[u8]) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "nbf", "sub"]);
    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
}
