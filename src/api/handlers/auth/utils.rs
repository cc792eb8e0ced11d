//! Small helpers for input validation and secret generation.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, header::AUTHORIZATION};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;

/// Per-token signing secrets are 16 random bytes, hex-encoded.
const TOKEN_SECRET_BYTES: usize = 16;

/// Validate an email against the configured pattern.
pub(super) fn valid_email(email: &str, pattern: &str) -> bool {
    Regex::new(pattern).is_ok_and(|regex| regex.is_match(email))
}

/// Validate a password: configured shape pattern plus at least one lowercase,
/// one uppercase, and one digit.
pub(super) fn valid_password(password: &str, pattern: &str) -> bool {
    let shape_ok = Regex::new(pattern).is_ok_and(|regex| regex.is_match(password));
    shape_ok
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Generate a fresh random signing secret for one pending registration.
/// Never reused across slugs.
pub(super) fn generate_token_secret() -> Result<String> {
    let mut bytes = [0u8; TOKEN_SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token secret")?;
    Ok(hex::encode(bytes))
}

/// Extract the bearer token from the `Authorization` header.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
