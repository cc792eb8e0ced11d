pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        jwt_secret: SecretString,
        base_url: String,
        email_regex: Option<String>,
        password_regex: Option<String>,
    },
}
