//! Refresh endpoint: trade a refresh token for a fresh short-lived pair.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::claims::TokenKind;
use super::revocation::AuthRejection;
use super::state::AuthState;
use super::types::SessionResponse;

#[utoipa::path(
    get,
    path = "/user/refresh/token",
    responses(
        (status = 200, description = "New session pair issued", body = SessionResponse),
        (status = 401, description = "Refresh token rejected", body = String)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn refresh(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match auth_state
        .revocation()
        .authenticate(&headers, TokenKind::Refresh)
        .await
    {
        Ok(claims) => claims,
        Err(rejection) => {
            return (rejection.status(), rejection.to_string()).into_response();
        }
    };

    // A refresh token minted by this service always carries the bundle; its
    // absence means the token was minted for another purpose.
    let Some(details) = claims.user_details else {
        let rejection = AuthRejection::InvalidToken;
        return (rejection.status(), rejection.to_string()).into_response();
    };

    // Refreshed pairs always use the short-lived policy; long sessions come
    // only from an explicit device signin.
    match auth_state.sessions().mint(&details, false) {
        Ok(pair) => (
            StatusCode::OK,
            Json(SessionResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Session refresh failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, Please try again".to_string(),
            )
                .into_response()
        }
    }
}
