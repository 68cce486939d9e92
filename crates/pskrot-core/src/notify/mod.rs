// ── Notifications ──
//
// Rotation results are mailed to operators (success) or support (failure).
// Delivery goes through the `Notifier` trait; `AnyNotifier` picks the
// concrete transport from configuration.

mod disabled;
mod gmail;
mod smtp;

use std::future::Future;

use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use thiserror::Error;

pub use disabled::DisabledNotifier;
pub use gmail::{DEFAULT_GMAIL_API_BASE, DEFAULT_GOOGLE_TOKEN_URL, GmailNotifier, GmailSettings};
pub use smtp::{SmtpNotifier, SmtpSettings};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no recipients configured for this notification")]
    NoRecipients,

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("HTTP error talking to Gmail: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error (HTTP {status}): {message}")]
    Gmail { status: u16, message: String },
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    /// Whether the run this notification reports on succeeded.
    pub success: bool,
}

/// Something that can deliver a [`Notification`].
pub trait Notifier {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Transport selected by configuration.
#[derive(Debug, Clone)]
pub enum NotifierSettings {
    Disabled,
    Gmail(GmailSettings),
    Smtp(SmtpSettings),
}

/// Enum dispatch over the configured transports.
pub enum AnyNotifier {
    Disabled(DisabledNotifier),
    Gmail(GmailNotifier),
    Smtp(SmtpNotifier),
}

impl AnyNotifier {
    pub fn from_settings(settings: &NotifierSettings, sender: &str) -> Result<Self, NotifyError> {
        Ok(match settings {
            NotifierSettings::Disabled => Self::Disabled(DisabledNotifier),
            NotifierSettings::Gmail(gmail) => Self::Gmail(GmailNotifier::new(gmail.clone(), sender)?),
            NotifierSettings::Smtp(smtp) => Self::Smtp(SmtpNotifier::new(smtp, sender)?),
        })
    }
}

impl Notifier for AnyNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Self::Disabled(n) => n.send(notification).await,
            Self::Gmail(n) => n.send(notification).await,
            Self::Smtp(n) => n.send(notification).await,
        }
    }
}

/// Build the RFC 5322 message shared by the SMTP and Gmail transports.
pub(crate) fn build_message(sender: &Mailbox, notification: &Notification) -> Result<Message, NotifyError> {
    if notification.recipients.is_empty() {
        return Err(NotifyError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(sender.clone())
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &notification.recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }
    Ok(builder.body(notification.body.clone())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn notification(recipients: &[&str]) -> Notification {
        Notification {
            subject: "PSK rotation".into(),
            body: "The new PSK is next-key".into(),
            recipients: recipients.iter().map(|r| (*r).to_owned()).collect(),
            success: true,
        }
    }

    #[test]
    fn message_addresses_every_recipient() {
        let sender: Mailbox = "rotator@example.com".parse().unwrap();
        let message = build_message(&sender, &notification(&["ops@example.com", "noc@example.com"])).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: rotator@example.com"), "{raw}");
        assert!(raw.contains("To: ops@example.com, noc@example.com"), "{raw}");
        assert!(raw.contains("Subject: PSK rotation"), "{raw}");
        assert!(raw.contains("The new PSK is next-key"), "{raw}");
    }

    #[test]
    fn message_without_recipients_is_rejected() {
        let sender: Mailbox = "rotator@example.com".parse().unwrap();
        let err = build_message(&sender, &notification(&[])).unwrap_err();
        assert!(matches!(err, NotifyError::NoRecipients));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let sender: Mailbox = "rotator@example.com".parse().unwrap();
        let err = build_message(&sender, &notification(&["not an address"])).unwrap_err();
        assert!(matches!(err, NotifyError::Address(_)));
    }
}
