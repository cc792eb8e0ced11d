//! Registration endpoint: validate the signup token and create the account.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::registration::RegistrationOutcome;
use super::state::AuthState;
use super::storage::{Principal, UserStatus};
use super::types::{MessageResponse, RegisterRequest};
use super::utils::valid_password;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = MessageResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Token missing or expired", body = String),
        (status = 403, description = "Token rejected or weak password", body = String),
        (status = 422, description = "Unprocessable registration", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim().to_string();

    let Ok(slug_id) = Uuid::parse_str(request.slug.trim()) else {
        return unprocessable();
    };

    let outcome = match auth_state
        .registration()
        .validate(slug_id, request.user_type, &request.token, &username)
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Registration validation failed: {err}");
            return internal_error();
        }
    };

    match outcome {
        RegistrationOutcome::Valid => {}
        RegistrationOutcome::Unprocessable => return unprocessable(),
        RegistrationOutcome::TokenMissing => {
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid signup token".to_string(),
            )
                .into_response();
        }
        RegistrationOutcome::Expired => {
            return (
                StatusCode::UNAUTHORIZED,
                "The provided token is expired".to_string(),
            )
                .into_response();
        }
        RegistrationOutcome::EmailMismatch | RegistrationOutcome::InvalidSignature => {
            return (
                StatusCode::FORBIDDEN,
                "Signup token verification failed".to_string(),
            )
                .into_response();
        }
    }

    match auth_state.users().find_by_username(&username).await {
        Ok(Some(_)) => {
            // The token served its purpose even though the account already
            // exists; burn it so it cannot be replayed.
            if let Err(err) = auth_state.registration().discard_token(&request.token).await {
                error!("Failed to discard signup token: {err}");
            }
            return (
                StatusCode::FORBIDDEN,
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

    if !valid_password(&request.password, auth_state.config().password_regex()) {
        return (
            StatusCode::FORBIDDEN,
            "Please provide a strong password".to_string(),
        )
            .into_response();
    }

    // First writer wins under double submit: losing this race means another
    // request already consumed the slug.
    match auth_state.registration().consume_slug(slug_id).await {
        Ok(true) => {}
        Ok(false) => return unprocessable(),
        Err(err) => {
            error!("Failed to consume registration slug: {err}");
            return internal_error();
        }
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = match Argon2::default().hash_password(request.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(err) => {
            error!("Password hashing failed: {err}");
            return internal_error();
        }
    };

    let user_id = Uuid::new_v4();
    let principal = Principal {
        user_id,
        username: username.to_lowercase(),
        firstname: request.firstname.trim().to_string(),
        lastname: request.lastname.trim().to_string(),
        password_hash,
        status: UserStatus::Active,
        user_type: request.user_type,
        timezone: request.timezone.unwrap_or_else(|| "UTC".to_string()),
        phone_number: request.phone_number.unwrap_or_default(),
        country_code: request.country_code.unwrap_or_default(),
        language_preference: request.language_preference.unwrap_or_else(|| "en".to_string()),
    };

    if let Err(err) = auth_state.users().insert_principal(principal).await {
        error!("Failed to create account: {err}");
        return internal_error();
    }
    if let Err(err) = auth_state
        .users()
        .upsert_group(&username.to_lowercase(), user_id, request.user_type)
        .await
    {
        error!("Failed to record user group: {err}");
        return internal_error();
    }
    if let Err(err) = auth_state.registration().discard_token(&request.token).await {
        error!("Failed to discard signup token: {err}");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Account created successfully".to_string(),
        }),
    )
        .into_response()
}

fn unprocessable() -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        "Unprocessable Entity".to_string(),
    )
        .into_response()
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong, Please try again".to_string(),
    )
        .into_response()
}
