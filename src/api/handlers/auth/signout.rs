//! Signout endpoint: revoke both halves of the active session.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::claims::TokenKind;
use super::revocation::RevokeOutcome;
use super::state::AuthState;
use super::types::{MessageResponse, SignoutRequest};

#[utoipa::path(
    delete,
    path = "/user/signout",
    request_body = SignoutRequest,
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 400, description = "Missing payload or bad refresh token", body = String),
        (status = 401, description = "Authentication failed", body = String)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn signout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignoutRequest>>,
) -> impl IntoResponse {
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

    let request: SignoutRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match auth_state
        .revocation()
        .revoke_session(&claims.jti, claims.kind, &request.refresh_token)
        .await
    {
        Ok(RevokeOutcome::Revoked) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "JWT revoked".to_string(),
            }),
        )
            .into_response(),
        Ok(RevokeOutcome::BadRefreshToken) => (
            StatusCode::BAD_REQUEST,
            "Invalid refresh token".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Session revocation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, Please try again".to_string(),
            )
                .into_response()
        }
    }
}
