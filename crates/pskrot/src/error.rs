//! CLI error types with miette diagnostics.
//!
//! Maps config, api, and workflow errors into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use pskrot_config::ConfigError;
use pskrot_core::{CoreError, NotifyError, QueueError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const QUEUE: i32 = 4;
    pub const MISMATCH: i32 = 5;
    pub const CONTROLLER: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(pskrot::no_config),
        help("Create it or point at one with --config / PSKROT_CONFIG.")
    )]
    NoConfig { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pskrot::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(
        code(pskrot::config),
        help("Check the YAML syntax and any PSKROT_* environment overrides.")
    )]
    Config { message: String },

    #[error("Email notifications are misconfigured: {source}")]
    #[diagnostic(code(pskrot::notifier), help("Check the email section of the configuration."))]
    Notifier {
        #[source]
        source: NotifyError,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("No credentials configured for {what}")]
    #[diagnostic(
        code(pskrot::no_credentials),
        help(
            "Set xiq.token (or xiq.token_env), store a token in the keyring under\n\
             service 'pskrot' / user 'xiq/token', or set xiq.username and xiq.password."
        )
    )]
    NoCredentials { what: String },

    #[error("Authentication with ExtremeCloud IQ failed: {message}")]
    #[diagnostic(
        code(pskrot::auth_failed),
        help("Verify the API token or account credentials.")
    )]
    AuthFailed { message: String },

    // ── Queue ────────────────────────────────────────────────────────
    #[error("PSK file {path} does not exist")]
    #[diagnostic(code(pskrot::queue_missing), help("Set queue_file to the CSV of upcoming keys."))]
    QueueMissing { path: String },

    #[error("PSK file {path} is empty")]
    #[diagnostic(code(pskrot::queue_empty), help("Add keys to the file, one per line."))]
    QueueEmpty { path: String },

    #[error("PSK file error: {message}")]
    #[diagnostic(code(pskrot::queue))]
    Queue { message: String },

    #[error("The PSK was changed but {path} was not updated")]
    #[diagnostic(
        code(pskrot::queue_not_persisted),
        help("Remove the key that was just used from the file before the next run.")
    )]
    QueueNotPersisted { path: String },

    // ── Rotation ─────────────────────────────────────────────────────
    #[error("{count} device(s) are in a configuration mismatch; PSK was not changed")]
    #[diagnostic(
        code(pskrot::mismatch_blocked),
        help(
            "Mismatched devices:\n{hostnames}\n\
             Push the pending configuration first, or set allow_mismatched: true."
        )
    )]
    MismatchBlocked { count: usize, hostnames: String },

    #[error("The PSK was not changed")]
    #[diagnostic(code(pskrot::rotation_failed), help("See the log output for the controller's response."))]
    RotationFailed,

    // ── Controller ───────────────────────────────────────────────────
    #[error("ExtremeCloud IQ request failed: {message}")]
    #[diagnostic(code(pskrot::controller))]
    Controller { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(pskrot::render))]
    Render { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. }
            | Self::Validation { .. }
            | Self::Config { .. }
            | Self::Notifier { .. } => exit_code::USAGE,
            Self::NoCredentials { .. } | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::QueueMissing { .. }
            | Self::QueueEmpty { .. }
            | Self::Queue { .. }
            | Self::QueueNotPersisted { .. } => exit_code::QUEUE,
            Self::MismatchBlocked { .. } => exit_code::MISMATCH,
            Self::Controller { .. } => exit_code::CONTROLLER,
            Self::RotationFailed | Self::Io(_) | Self::Render { .. } => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { what } => Self::NoCredentials { what },
            ConfigError::Figment(err) => Self::Config {
                message: err.to_string(),
            },
            ConfigError::Io(err) => Self::Config {
                message: err.to_string(),
            },
        }
    }
}

impl From<pskrot_api::Error> for CliError {
    fn from(err: pskrot_api::Error) -> Self {
        if err.is_auth() {
            Self::AuthFailed {
                message: err.to_string(),
            }
        } else {
            Self::Controller {
                message: err.to_string(),
            }
        }
    }
}

impl From<QueueError> for CliError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound { path } => Self::QueueMissing {
                path: path.display().to_string(),
            },
            other => Self::Queue {
                message: other.to_string(),
            },
        }
    }
}

impl From<NotifyError> for CliError {
    fn from(source: NotifyError) -> Self {
        Self::Notifier { source }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::QueueMissing { path } => Self::QueueMissing {
                path: path.display().to_string(),
            },
            CoreError::QueueEmpty { path } => Self::QueueEmpty {
                path: path.display().to_string(),
            },
            CoreError::Queue(err) => err.into(),
            CoreError::MismatchBlocked { hostnames } => Self::MismatchBlocked {
                count: hostnames.len(),
                hostnames: hostnames.join("\n"),
            },
            CoreError::Api(err) => err.into(),
        }
    }
}
