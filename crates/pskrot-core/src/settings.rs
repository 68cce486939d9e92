// ── Rotation settings ──
//
// Immutable inputs of one rotation run, built once by the config layer
// and passed by reference into the workflow.

use std::path::PathBuf;
use std::time::Duration;

use pskrot_api::DEFAULT_PAGE_SIZE;

pub const DEFAULT_SUBJECT: &str = "PSK rotation";
pub const DEFAULT_SUCCESS_MESSAGE: &str = "The new PSK is";

/// What the workflow does and where it reports.
#[derive(Debug, Clone)]
pub struct RotationSettings {
    /// SSID whose PSK is rotated.
    pub ssid_id: String,
    pub queue_file: PathBuf,
    /// Rotate even when devices report a configuration mismatch.
    pub allow_mismatched: bool,
    /// Push the new configuration to online devices after a rotation.
    pub allow_config_push: bool,
    /// Requeue the consumed key at the tail instead of discarding it.
    pub reuse_keys: bool,
    /// Delay before the mismatch listing.
    pub mismatch_wait: Duration,
    pub page_size: u32,
    pub location_id: Option<i64>,
    pub email: EmailSettings,
}

impl RotationSettings {
    pub fn new(ssid_id: impl Into<String>, queue_file: impl Into<PathBuf>) -> Self {
        Self {
            ssid_id: ssid_id.into(),
            queue_file: queue_file.into(),
            allow_mismatched: false,
            allow_config_push: true,
            reuse_keys: false,
            mismatch_wait: Duration::ZERO,
            page_size: DEFAULT_PAGE_SIZE,
            location_id: None,
            email: EmailSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub subject: String,
    /// Prefix of the success body; the new key follows it.
    pub success_message: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub support_recipients: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.into(),
            success_message: DEFAULT_SUCCESS_MESSAGE.into(),
            sender: String::new(),
            recipients: Vec::new(),
            support_recipients: Vec::new(),
        }
    }
}

impl EmailSettings {
    /// Recipients of failure reports. Falls back to the operator list.
    pub fn support(&self) -> &[String] {
        if self.support_recipients.is_empty() {
            &self.recipients
        } else {
            &self.support_recipients
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_falls_back_to_operators() {
        let mut email = EmailSettings {
            recipients: vec!["ops@example.com".into()],
            ..EmailSettings::default()
        };
        assert_eq!(email.support(), ["ops@example.com".to_string()]);

        email.support_recipients = vec!["help@example.com".into()];
        assert_eq!(email.support(), ["help@example.com".to_string()]);
    }
}
