//! User identity and authentication backend.
//!
//! Issues short-lived signup tokens, registers accounts against them, and
//! manages JWT access/refresh session pairs with blocklist-based revocation.

pub mod api;
pub mod cli;
