// Authentication
//
// XIQ accepts a bearer token on every request. Operators either paste an
// API token into the config or supply account credentials, in which case
// a session login exchanges them for an access token.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::XiqClient;
use crate::error::Error;

/// Credentials for authenticating with ExtremeCloud IQ.
///
/// Consumed once by [`XiqClient::connect`]; the resulting client carries
/// only the bearer header.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Pre-generated API token.
    Token(SecretString),
    /// Account credentials for `POST /login`.
    Login {
        username: String,
        password: SecretString,
    },
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

impl XiqClient {
    /// Exchange account credentials for an access token.
    ///
    /// `POST /login` with `{"username", "password"}`. Any failure, including
    /// a response without `access_token`, is reported as
    /// [`Error::Authentication`].
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let url = self.url("login")?;
        debug!(username, "logging in at {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .post("get XIQ token", &url, &body)
            .await
            .map_err(|e| Error::Authentication {
                message: format!("login failed: {e}"),
            })?;

        let parsed: LoginResponse =
            serde_json::from_value(resp.body).map_err(|e| Error::Authentication {
                message: format!("unexpected login response: {e}"),
            })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                debug!("login successful");
                Ok(SecretString::from(token))
            }
            _ => Err(Error::Authentication {
                message: "unable to obtain an access token from XIQ".into(),
            }),
        }
    }
}
