//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use super::handlers::auth::{profile, refresh, register, signin, signout, signup, storage, types};
use super::handlers::health;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        signup::signup,
        register::register,
        signin::signin,
        signout::signout,
        refresh::refresh,
        profile::me,
        profile::search,
    ),
    components(schemas(
        health::Health,
        types::SignupRequest,
        types::SignupResponse,
        types::RegisterRequest,
        types::MessageResponse,
        types::SigninRequest,
        types::SessionResponse,
        types::SignoutRequest,
        types::ProfileResponse,
        types::SearchResponse,
        storage::UserType,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup token issuance and registration"),
        (name = "user", description = "Sessions and profile"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
