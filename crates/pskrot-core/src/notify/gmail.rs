// Gmail API delivery.
//
// A long-lived OAuth2 refresh token is exchanged for an access token on
// every send, then the RFC 5322 message is posted base64url-encoded to
// `users.messages.send`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use lettre::message::Mailbox;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{Notification, Notifier, NotifyError, build_message};

pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/";

/// OAuth2 client and refresh token for the sending account.
#[derive(Debug, Clone)]
pub struct GmailSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub token_url: Url,
    pub api_base: Url,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

pub struct GmailNotifier {
    http: reqwest::Client,
    settings: GmailSettings,
    sender: Mailbox,
}

impl GmailNotifier {
    pub fn new(settings: GmailSettings, sender: &str) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pskrot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            settings,
            sender: sender.parse()?,
        })
    }

    async fn access_token(&self) -> Result<SecretString, NotifyError> {
        debug!(url = %self.settings.token_url, "refreshing Gmail access token");
        let resp = self
            .http
            .post(self.settings.token_url.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.expose_secret()),
                ("refresh_token", self.settings.refresh_token.expose_secret()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Gmail {
                status: status.as_u16(),
                message: format!("token refresh failed: {message}"),
            });
        }

        let token: TokenResponse = resp.json().await?;
        Ok(SecretString::from(token.access_token))
    }

    fn send_url(&self) -> Result<Url, NotifyError> {
        self.settings
            .api_base
            .join("gmail/v1/users/me/messages/send")
            .map_err(|e| NotifyError::Gmail {
                status: 0,
                message: format!("invalid Gmail API base URL: {e}"),
            })
    }
}

impl Notifier for GmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = build_message(&self.sender, notification)?;
        let raw = URL_SAFE.encode(message.formatted());
        let url = self.send_url()?;
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&json!({ "raw": raw }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Gmail {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendResponse = resp.json().await?;
        info!(
            message_id = sent.id.as_deref().unwrap_or("unknown"),
            recipients = notification.recipients.len(),
            "email sent via Gmail"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(server: &MockServer) -> GmailSettings {
        GmailSettings {
            client_id: "client-1".into(),
            client_secret: SecretString::from("shh".to_string()),
            refresh_token: SecretString::from("refresh-1".to_string()),
            token_url: Url::parse(&format!("{}/token", server.uri())).unwrap(),
            api_base: Url::parse(&format!("{}/", server.uri())).unwrap(),
        }
    }

    fn notification() -> Notification {
        Notification {
            subject: "PSK rotation".into(),
            body: "The new PSK is next-key".into(),
            recipients: vec!["ops@example.com".into()],
            success: true,
        }
    }

    #[tokio::test]
    async fn send_refreshes_token_then_posts_raw_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "ya29.token", "expires_in": 3599 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("Authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = GmailNotifier::new(settings(&server), "rotator@example.com").unwrap();
        notifier.send(&notification()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        let raw = URL_SAFE.decode(body["raw"].as_str().unwrap()).unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.contains("To: ops@example.com"), "{raw}");
        assert!(raw.contains("The new PSK is next-key"), "{raw}");
    }

    #[tokio::test]
    async fn rejected_send_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
            .mount(&server)
            .await;

        let notifier = GmailNotifier::new(settings(&server), "rotator@example.com").unwrap();
        let err = notifier.send(&notification()).await.unwrap_err();

        match err {
            NotifyError::Gmail { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "insufficient scope");
            }
            other => panic!("expected Gmail error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_token_refresh_skips_send() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = GmailNotifier::new(settings(&server), "rotator@example.com").unwrap();
        let err = notifier.send(&notification()).await.unwrap_err();

        assert!(matches!(err, NotifyError::Gmail { status: 400, .. }), "got: {err:?}");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
