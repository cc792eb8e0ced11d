//! Request/response types for the auth and user endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::storage::UserType;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    #[serde(default)]
    pub user_type: UserType,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupResponse {
    pub email: String,
    pub token: String,
    pub url: String,
    pub user_type: UserType,
    pub slug: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub token: String,
    pub slug: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub language_preference: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
    /// Client location hint; `device` and `mobile_app` select the long-lived
    /// session policy.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignoutRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub user_id: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub user_type: UserType,
    pub timezone: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
    pub language_preference: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SearchResponse {
    pub users: Vec<ProfileResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn signup_request_defaults_user_type() -> Result<()> {
        let request: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com"
        }))?;
        assert_eq!(request.user_type, UserType::Customer);
        Ok(())
    }

    #[test]
    fn signup_response_round_trips() -> Result<()> {
        let response = SignupResponse {
            email: "alice@example.com".to_string(),
            token: "jwt".to_string(),
            url: "http://localhost:8080/register".to_string(),
            user_type: UserType::Customer,
            slug: "slug".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: SignupResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.slug, "slug");
        Ok(())
    }

    #[test]
    fn register_request_optional_fields_default_to_none() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice@example.com",
            "password": "Password1!",
            "firstname": "Alice",
            "lastname": "Doe",
            "token": "jwt",
            "slug": "00000000-0000-0000-0000-000000000000"
        }))?;
        assert!(request.timezone.is_none());
        assert!(request.phone_number.is_none());
        assert_eq!(request.user_type, UserType::Customer);
        Ok(())
    }

    #[test]
    fn signin_request_location_is_optional() -> Result<()> {
        let request: SigninRequest = serde_json::from_value(serde_json::json!({
            "username": "alice@example.com",
            "password": "Password1!"
        }))?;
        assert!(request.location.is_none());
        Ok(())
    }
}
