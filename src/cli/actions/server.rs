use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            jwt_secret,
            base_url,
            email_regex,
            password_regex,
        } => {
            let mut config = AuthConfig::new(jwt_secret, base_url);
            if let Some(pattern) = email_regex {
                config = config.with_email_regex(pattern);
            }
            if let Some(pattern) = password_regex {
                config = config.with_password_regex(pattern);
            }

            api::new(port, dsn, config).await?;
        }
    }

    Ok(())
}
