// SMTP submission with STARTTLS and AUTH.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use super::{Notification, Notifier, NotifyError, build_message};

/// Submission server settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    server: String,
}

impl SmtpNotifier {
    /// Build the transport. No connection is opened until the first send.
    pub fn new(settings: &SmtpSettings, sender: &str) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().to_owned(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
            .port(settings.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender: sender.parse()?,
            server: settings.server.clone(),
        })
    }
}

impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = build_message(&self.sender, notification)?;
        debug!(server = %self.server, "submitting message over SMTP");

        let response = self.transport.send(message).await?;
        info!(
            server = %self.server,
            code = %response.code(),
            recipients = notification.recipients.len(),
            "email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_connecting() {
        let settings = SmtpSettings {
            server: "smtp.example.com".into(),
            port: 587,
            username: "rotator".into(),
            password: SecretString::from("app-password".to_string()),
        };

        let notifier = SmtpNotifier::new(&settings, "rotator@example.com").unwrap();
        assert_eq!(notifier.sender.email.to_string(), "rotator@example.com");
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let settings = SmtpSettings {
            server: "smtp.example.com".into(),
            port: 587,
            username: "rotator".into(),
            password: SecretString::from("app-password".to_string()),
        };

        assert!(matches!(
            SmtpNotifier::new(&settings, "nobody"),
            Err(NotifyError::Address(_))
        ));
    }
}
