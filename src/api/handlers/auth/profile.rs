//! Authenticated profile lookup and user search.

use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::claims::TokenKind;
use super::revocation::AuthRejection;
use super::state::AuthState;
use super::storage::{Principal, UserStatus};
use super::types::{ProfileResponse, SearchResponse};

const SEARCH_LIMIT: i64 = 20;

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

fn profile_from(principal: Principal) -> ProfileResponse {
    let optional = |value: String| if value.is_empty() { None } else { Some(value) };
    ProfileResponse {
        user_id: principal.user_id.to_string(),
        username: principal.username,
        firstname: principal.firstname,
        lastname: principal.lastname,
        user_type: principal.user_type,
        timezone: optional(principal.timezone),
        phone_number: optional(principal.phone_number),
        country_code: optional(principal.country_code),
        language_preference: optional(principal.language_preference),
    }
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse),
        (status = 401, description = "Authentication failed", body = String),
        (status = 403, description = "User is not active", body = String),
        (status = 404, description = "User not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn me(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let claims = match auth_state
        .revocation()
        .authenticate(&headers, TokenKind::Access)
        .await
    {
        Ok(claims) => claims,
        Err(rejection) => {
            return (rejection.status(), rejection.to_string()).into_response();
        }
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        let rejection = AuthRejection::InvalidToken;
        return (rejection.status(), rejection.to_string()).into_response();
    };

    let principal = match auth_state.users().find_by_id(user_id).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "User not found".to_string()).into_response();
        }
        Err(err) => {
            error!("User lookup failed: {err}");
            return internal_error();
        }
    };

    if principal.status != UserStatus::Active {
        let rejection = AuthRejection::Inactive;
        return (rejection.status(), rejection.to_string()).into_response();
    }

    (StatusCode::OK, Json(profile_from(principal))).into_response()
}

#[utoipa::path(
    get,
    path = "/user/search",
    params(
        ("q" = String, Query, description = "Substring matched against username and names")
    ),
    responses(
        (status = 200, description = "Matching users", body = SearchResponse),
        (status = 400, description = "Missing search term", body = String),
        (status = 401, description = "Authentication failed", body = String)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn search(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    params: Query<SearchParams>,
) -> impl IntoResponse {
    if let Err(rejection) = auth_state
        .revocation()
        .authenticate(&headers, TokenKind::Access)
        .await
    {
        return (rejection.status(), rejection.to_string()).into_response();
    }

    let term = match params.q.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => term.to_string(),
        _ => {
            return (StatusCode::BAD_REQUEST, "Missing search term".to_string()).into_response();
        }
    };

    match auth_state.users().search(&term, SEARCH_LIMIT).await {
        Ok(principals) => (
            StatusCode::OK,
            Json(SearchResponse {
                users: principals.into_iter().map(profile_from).collect(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("User search failed: {err}");
            internal_error()
        }
    }
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong, Please try again".to_string(),
    )
        .into_response()
}
