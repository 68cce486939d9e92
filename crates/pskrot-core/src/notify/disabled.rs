use tracing::info;

use super::{Notification, Notifier, NotifyError};

/// Logs the notification instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            success = notification.success,
            subject = %notification.subject,
            recipients = ?notification.recipients,
            "email is disabled; message: {}",
            notification.body
        );
        Ok(())
    }
}
