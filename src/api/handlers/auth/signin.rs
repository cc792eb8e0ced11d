//! Signin endpoint: verify credentials and mint a session pair.

use argon2::{Argon2, PasswordVerifier, password_hash::PasswordHash};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::claims::UserDetails;
use super::session::SessionIssuer;
use super::state::AuthState;
use super::storage::UserStatus;
use super::types::{SessionResponse, SigninRequest};

#[utoipa::path(
    post,
    path = "/user/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Session pair issued", body = SessionResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Credentials rejected", body = String)
    ),
    tag = "user"
)]
pub async fn signin(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> impl IntoResponse {
    let request: SigninRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim();

    let principal = match auth_state.users().find_by_username(username).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return credentials_rejected(),
        Err(err) => {
            error!("User lookup failed: {err}");
            return internal_error();
        }
    };

    if principal.status != UserStatus::Active {
        return (StatusCode::UNAUTHORIZED, "User is not active".to_string()).into_response();
    }

    let Ok(parsed_hash) = PasswordHash::new(&principal.password_hash) else {
        error!("Stored password hash is malformed for user {}", principal.user_id);
        return internal_error();
    };
    if Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return credentials_rejected();
    }

    let details = UserDetails {
        user_id: principal.user_id.to_string(),
        username: principal.username,
        user_type: principal.user_type,
    };
    let long_lived = SessionIssuer::long_lived_location(request.location.as_deref());

    match auth_state.sessions().mint(&details, long_lived) {
        Ok(pair) => (
            StatusCode::OK,
            Json(SessionResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Session minting failed: {err}");
            internal_error()
        }
    }
}

fn credentials_rejected() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        "Username or password is incorrect".to_string(),
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

#[cfg(test)]
mod tests {
    use super::super::claims;
    use super::super::memory::{MemoryTokenStore, MemoryUserStore};
    use super::super::state::{AuthConfig, AuthState};
    use super::super::storage::{Principal, UserStatus, UserStore, UserType};
    use super::super::types::{SessionResponse, SigninRequest};
    use super::signin;
    use anyhow::Result;
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };
    use axum::Json;
    use axum::body::to_bytes;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use std::sync::Arc;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";
    const PASSWORD: &str = "Str0ngPass!";

    fn state(users: Arc<MemoryUserStore>) -> Arc<AuthState> {
        let config = AuthConfig::new(
            SecretString::from(SECRET.to_string()),
            "http://localhost:8080".to_string(),
        );
        Arc::new(AuthState::new(
            config,
            Arc::new(MemoryTokenStore::new()),
            users,
        ))
    }

    async fn seed_user(users: &MemoryUserStore, status: UserStatus) -> Result<Uuid> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(PASSWORD.as_bytes(), &salt)
            .expect("hash")
            .to_string();
        let user_id = Uuid::new_v4();
        users
            .insert_principal(Principal {
                user_id,
                username: "alice@example.com".to_string(),
                firstname: "Alice".to_string(),
                lastname: "Smith".to_string(),
                password_hash: hash,
                status,
                user_type: UserType::Customer,
                timezone: "UTC".to_string(),
                phone_number: String::new(),
                country_code: String::new(),
                language_preference: "en".to_string(),
            })
            .await?;
        Ok(user_id)
    }

    fn request(username: &str, password: &str, location: Option<&str>) -> Option<Json<SigninRequest>> {
        Some(Json(SigninRequest {
            username: username.to_string(),
            password: password.to_string(),
            location: location.map(str::to_string),
        }))
    }

    async fn session_body(response: axum::response::Response) -> Result<SessionResponse> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn signin_missing_payload() {
        let state = state(Arc::new(MemoryUserStore::new()));
        let response = signin(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signin_mints_short_pair_by_default() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        let user_id = seed_user(&users, UserStatus::Active).await?;
        let state = state(users);

        let response = signin(
            Extension(state),
            request("alice@example.com", PASSWORD, None),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = session_body(response).await?;
        let access = claims::decode(&body.access_token, SECRET.as_bytes())?;
        assert_eq!(access.sub, user_id.to_string());
        assert_eq!(access.exp - access.iat, 10 * 60);
        let refresh = claims::decode(&body.refresh_token, SECRET.as_bytes())?;
        assert_eq!(refresh.exp - refresh.iat, 12 * 60);
        Ok(())
    }

    #[tokio::test]
    async fn signin_device_location_mints_long_pair() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        seed_user(&users, UserStatus::Active).await?;
        let state = state(users);

        let response = signin(
            Extension(state),
            request("alice@example.com", PASSWORD, Some("device")),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = session_body(response).await?;
        let access = claims::decode(&body.access_token, SECRET.as_bytes())?;
        assert_eq!(access.exp - access.iat, 12 * 3600);
        Ok(())
    }

    #[tokio::test]
    async fn signin_rejects_unknown_user_and_wrong_password_alike() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        seed_user(&users, UserStatus::Active).await?;
        let state = state(users);

        let response = signin(
            Extension(Arc::clone(&state)),
            request("bob@example.com", PASSWORD, None),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = signin(
            Extension(state),
            request("alice@example.com", "WrongPass1!", None),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn signin_rejects_inactive_user() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        seed_user(&users, UserStatus::Inactive).await?;
        let state = state(users);

        let response = signin(
            Extension(state),
            request("alice@example.com", PASSWORD, None),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn signin_matches_mixed_case_username() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        seed_user(&users, UserStatus::Active).await?;
        let state = state(users);

        let response = signin(
            Extension(state),
            request("Alice@Example.com", PASSWORD, None),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
