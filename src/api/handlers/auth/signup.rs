//! Signup endpoint: mint a registration token and its slug.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::issuer::IssueError;
use super::state::AuthState;
use super::storage::TokenPurpose;
use super::types::{SignupRequest, SignupResponse};

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Signup token issued", body = SignupResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "User already exists", body = String),
        (status = 403, description = "Invalid email", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = request.email.trim().to_string();

    let limited = match auth_state
        .rate_limiter()
        .is_limited(&email, TokenPurpose::Signup)
        .await
    {
        Ok(limited) => limited,
        Err(err) => {
            error!("Rate limit check failed: {err}");
            return internal_error();
        }
    };
    if limited {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Maximum limit exceeded. Please try after some time".to_string(),
        )
            .into_response();
    }

    match auth_state.users().find_by_username(&email).await {
        Ok(Some(_)) => {
            return (
                StatusCode::UNAUTHORIZED,
                "This user already exists".to_string(),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => {
            error!("User lookup failed: {err}");
            return internal_error();
        }
    }

    match auth_state
        .issuer()
        .issue(&email, request.user_type, TokenPurpose::Signup)
        .await
    {
        Ok(issued) => (
            StatusCode::OK,
            Json(SignupResponse {
                email,
                token: issued.token,
                url: auth_state.config().register_url(),
                user_type: request.user_type,
                slug: issued.slug_id.to_string(),
            }),
        )
            .into_response(),
        Err(IssueError::InvalidEmail) => (
            StatusCode::FORBIDDEN,
            "Provide a valid email id".to_string(),
        )
            .into_response(),
        Err(IssueError::Internal(err)) => {
            error!("Signup token issuance failed: {err}");
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
