// ── Rotation workflow ──
//
// Linear run: load queue, mismatch gate, change PSK, persist queue,
// optional config push, notify. Every abort notifies the support list
// before returning. Retries live in the API client only; nothing here
// is retried.

use pskrot_api::{PskChange, XiqClient};
use tracing::{error, info, warn};

use crate::error::CoreError;
use crate::notify::{Notification, Notifier};
use crate::queue::{PskQueue, QueueError};
use crate::settings::RotationSettings;

const PSK_CHANGE_FAILED: &str = "Script failed to change PSK. Please check logs";
const PUSH_DISABLED: &str =
    "Configuration pushing is disabled. New PSK will be used once configuration is pushed.";
const NO_ONLINE_DEVICES: &str = "No online devices were found; configuration was not pushed.";

/// Result of the configuration push step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    /// Pushing is turned off.
    Disabled,
    NoOnlineDevices,
    /// The deployment was accepted; holds the LRO status seen at the single check.
    Reported(String),
    /// The push could not be requested or checked.
    Failed(String),
}

impl PushStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Disabled => PUSH_DISABLED.to_owned(),
            Self::NoOnlineDevices => NO_ONLINE_DEVICES.to_owned(),
            Self::Reported(status) => format_push_status(status),
            Self::Failed(reason) => format!("The configuration push could not be completed: {reason}"),
        }
    }
}

/// Past-tense statuses (`SUCCEEDED`, `FAILED`) read as "The configuration
/// push FAILED"; anything else as "The configuration push is PENDING".
pub fn format_push_status(status: &str) -> String {
    if status.ends_with("ED") {
        format!("The configuration push {status}")
    } else {
        format!("The configuration push is {status}")
    }
}

/// Everything one run produced. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// The key that was attempted.
    pub new_psk: Option<String>,
    pub rotated: bool,
    pub push: Option<PushStatus>,
    /// False when the PSK changed but the queue file could not be rewritten.
    pub queue_persisted: bool,
    /// Keys left in the queue file after the run.
    pub remaining: usize,
    pub message: String,
    pub recipients: Vec<String>,
}

impl RotationOutcome {
    pub fn is_success(&self) -> bool {
        self.rotated && self.queue_persisted
    }
}

pub struct RotationWorkflow<N> {
    settings: RotationSettings,
    notifier: N,
}

impl<N: Notifier + Sync> RotationWorkflow<N> {
    pub fn new(settings: RotationSettings, notifier: N) -> Self {
        Self { settings, notifier }
    }

    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Load and run against `client`.
    pub async fn run(&self, client: &XiqClient) -> Result<RotationOutcome, CoreError> {
        let queue = self.load_queue().await?;
        self.rotate(client, queue).await
    }

    /// Read the queue file. A missing, unreadable, or empty file notifies
    /// support and aborts. Makes no network call to the controller.
    pub async fn load_queue(&self) -> Result<PskQueue, CoreError> {
        let path = &self.settings.queue_file;
        let err = match PskQueue::load(path) {
            Ok(queue) if !queue.is_empty() => return Ok(queue),
            Ok(_) => CoreError::QueueEmpty { path: path.clone() },
            Err(QueueError::NotFound { path }) => CoreError::QueueMissing { path },
            Err(other) => CoreError::Queue(other),
        };

        error!(error = %err, "cannot start rotation");
        self.notify_support(&err.to_string()).await;
        Err(err)
    }

    /// Run the mismatch gate, change the PSK, and report.
    pub async fn rotate(
        &self,
        client: &XiqClient,
        mut queue: PskQueue,
    ) -> Result<RotationOutcome, CoreError> {
        self.check_mismatches(client).await?;

        let queued = queue.len();
        let Some(new_psk) = queue.take_next(self.settings.reuse_keys) else {
            let err = CoreError::QueueEmpty {
                path: queue.path().to_path_buf(),
            };
            self.notify_support(&err.to_string()).await;
            return Err(err);
        };

        let mut message = String::new();
        let mut queue_persisted = true;

        let rotated = match client.change_psk(&self.settings.ssid_id, &new_psk).await? {
            PskChange::Changed => {
                info!(ssid_id = %self.settings.ssid_id, "successfully updated PSK");
                message.push_str(&format!("{} {new_psk}\n\n", self.settings.email.success_message));

                if let Err(e) = queue.persist() {
                    error!(error = %e, "PSK changed but the queue file was not updated");
                    queue_persisted = false;
                    message.push_str(&format!(
                        "The PSK file {} could not be updated ({e}). Remove the key above from it before the next run.\n\n",
                        queue.path().display()
                    ));
                } else {
                    info!(path = %queue.path().display(), remaining = queue.len(), "updated PSK file");
                }
                true
            }
            PskChange::Failed { reason } => {
                error!(%reason, "PSK was not changed");
                message.push_str(PSK_CHANGE_FAILED);
                message.push_str("\n\n");
                false
            }
        };

        let push = match (rotated, self.settings.allow_config_push) {
            (false, _) => None,
            (true, true) => Some(self.push_config(client).await),
            (true, false) => Some(PushStatus::Disabled),
        };
        if let Some(status) = &push {
            message.push_str(&status.message());
        }

        let recipients = if rotated {
            self.settings.email.recipients.clone()
        } else {
            self.settings.email.support().to_vec()
        };
        self.notify(&message, &recipients, rotated).await;

        Ok(RotationOutcome {
            new_psk: Some(new_psk),
            rotated,
            push,
            queue_persisted,
            remaining: if rotated && queue_persisted { queue.len() } else { queued },
            message,
            recipients,
        })
    }

    async fn check_mismatches(&self, client: &XiqClient) -> Result<(), CoreError> {
        let devices = match client
            .list_mismatched_devices(
                self.settings.page_size,
                self.settings.location_id,
                self.settings.mismatch_wait,
            )
            .await
        {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "could not check for mismatched devices");
                self.notify_support(&format!(
                    "Script failed to check for mismatched devices. PSK will not be changed.\n\n{e}"
                ))
                .await;
                return Err(e.into());
            }
        };

        if devices.is_empty() {
            return Ok(());
        }
        if self.settings.allow_mismatched {
            warn!(count = devices.len(), "mismatched devices found; continuing as allowed");
            return Ok(());
        }

        let hostnames: Vec<String> = devices.into_iter().map(|d| d.hostname).collect();
        warn!(
            count = hostnames.len(),
            "mismatched devices found and mismatches are not allowed; PSK will not be changed"
        );
        self.notify_support(&format!(
            "Mismatched devices were found in XIQ. Mismatches are not allowed, so the PSK will not be changed.\n\n\
             The following APs are in a mismatched state:\n{}",
            hostnames.join("\n")
        ))
        .await;
        Err(CoreError::MismatchBlocked { hostnames })
    }

    async fn push_config(&self, client: &XiqClient) -> PushStatus {
        let devices = match client
            .list_online_devices(self.settings.page_size, self.settings.location_id)
            .await
        {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "could not list online devices");
                return PushStatus::Failed(e.to_string());
            }
        };
        if devices.is_empty() {
            warn!("no online devices; configuration not pushed");
            return PushStatus::NoOnlineDevices;
        }

        let ids: Vec<i64> = devices.iter().map(|d| d.id).collect();
        match client.push_config(&ids).await {
            Ok(status) => {
                info!(%status, devices = ids.len(), "configuration push checked");
                PushStatus::Reported(status)
            }
            Err(e) => {
                error!(error = %e, "configuration push failed");
                PushStatus::Failed(e.to_string())
            }
        }
    }

    /// Send a failure report to the support list. Delivery errors are logged.
    pub async fn notify_support(&self, body: &str) {
        self.notify(body, self.settings.email.support(), false).await;
    }

    async fn notify(&self, body: &str, recipients: &[String], success: bool) {
        let notification = Notification {
            subject: self.settings.email.subject.clone(),
            body: body.to_owned(),
            recipients: recipients.to_vec(),
            success,
        };
        if let Err(e) = self.notifier.send(&notification).await {
            error!(error = %e, "failed to send notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_status_formatting() {
        assert_eq!(format_push_status("FAILED"), "The configuration push FAILED");
        assert_eq!(format_push_status("SUCCEEDED"), "The configuration push SUCCEEDED");
        assert_eq!(format_push_status("PENDING"), "The configuration push is PENDING");
        assert_eq!(format_push_status("RUNNING"), "The configuration push is RUNNING");
    }

    #[test]
    fn push_status_messages() {
        assert_eq!(PushStatus::Disabled.message(), PUSH_DISABLED);
        assert_eq!(PushStatus::NoOnlineDevices.message(), NO_ONLINE_DEVICES);
        assert!(PushStatus::Failed("boom".into()).message().ends_with("boom"));
    }

    #[test]
    fn outcome_success_needs_persisted_queue() {
        let outcome = RotationOutcome {
            new_psk: Some("A".into()),
            rotated: true,
            push: None,
            queue_persisted: false,
            remaining: 2,
            message: String::new(),
            recipients: Vec::new(),
        };
        assert!(!outcome.is_success());
        assert!(RotationOutcome { queue_persisted: true, ..outcome }.is_success());
    }
}
