//! Configuration for pskrot.
//!
//! A YAML file plus `PSKROT_` environment overrides, credential
//! resolution (env var, keyring, plaintext), and translation into the
//! typed settings the api and core crates consume.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use pskrot_api::{Backoff, ClientConfig, Credential, RetryPolicy, TlsMode, TransportConfig};
use pskrot_core::notify::{
    DEFAULT_GMAIL_API_BASE, DEFAULT_GOOGLE_TOKEN_URL, GmailSettings, NotifierSettings, SmtpSettings,
};
use pskrot_core::{EmailSettings, RotationSettings};

/// Keyring service under which secrets are looked up.
pub const KEYRING_SERVICE: &str = "pskrot";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for {what}")]
    NoCredentials { what: String },

    #[error("config file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── YAML config structs ─────────────────────────────────────────────

/// Top-level YAML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub xiq: XiqConfig,

    /// SSID whose PSK is rotated.
    pub ssid_id: Option<String>,

    #[serde(default = "default_queue_file")]
    pub queue_file: PathBuf,

    #[serde(default)]
    pub allow_mismatched: bool,

    #[serde(default = "default_true")]
    pub allow_config_push: bool,

    #[serde(default)]
    pub reuse_keys: bool,

    /// Seconds to wait before listing mismatched devices.
    #[serde(default)]
    pub mismatch_wait_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    pub location_id: Option<i64>,

    /// Seconds between a config push and its status check.
    #[serde(default = "default_lro_delay")]
    pub lro_delay_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xiq: XiqConfig::default(),
            ssid_id: None,
            queue_file: default_queue_file(),
            allow_mismatched: false,
            allow_config_push: true,
            reuse_keys: false,
            mismatch_wait_secs: 0,
            page_size: default_page_size(),
            location_id: None,
            lro_delay_secs: default_lro_delay(),
            retry: RetryConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_queue_file() -> PathBuf {
    PathBuf::from("psk_list.csv")
}
fn default_page_size() -> u32 {
    pskrot_api::DEFAULT_PAGE_SIZE
}
fn default_lro_delay() -> u64 {
    pskrot_api::DEFAULT_LRO_DELAY.as_secs()
}

/// Controller connection.
#[derive(Debug, Deserialize, Serialize)]
pub struct XiqConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Account for `POST /login` when no token is available.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for XiqConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            token_env: None,
            username: None,
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    pskrot_api::DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    None,
    Fixed,
    Exponential,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: BackoffKind,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffKind::None,
            backoff_ms: default_backoff_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    pskrot_api::retry::DEFAULT_MAX_ATTEMPTS
}
fn default_backoff_ms() -> u64 {
    1000
}
fn default_backoff_max_ms() -> u64 {
    30_000
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.backoff_ms);
        let backoff = match self.backoff {
            BackoffKind::None => Backoff::None,
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(self.backoff_max_ms),
            },
        };
        RetryPolicy::new(self.max_attempts, backoff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransport {
    #[default]
    Disabled,
    Gmail,
    Smtp,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub transport: EmailTransport,

    #[serde(default = "default_subject")]
    pub subject: String,

    /// Body prefix on success; the new key follows it.
    #[serde(default = "default_success_message")]
    pub success_message: String,

    #[serde(default)]
    pub sender: String,

    #[serde(default)]
    pub recipients: Vec<String>,

    /// Failure reports. Empty means the operator recipients.
    #[serde(default)]
    pub support_recipients: Vec<String>,

    pub smtp: Option<SmtpConfig>,

    pub gmail: Option<GmailConfig>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransport::Disabled,
            subject: default_subject(),
            success_message: default_success_message(),
            sender: String::new(),
            recipients: Vec::new(),
            support_recipients: Vec::new(),
            smtp: None,
            gmail: None,
        }
    }
}

fn default_subject() -> String {
    pskrot_core::settings::DEFAULT_SUBJECT.into()
}
fn default_success_message() -> String {
    pskrot_core::settings::DEFAULT_SUCCESS_MESSAGE.into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub server: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    pub username: String,

    pub password: Option<String>,

    pub password_env: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GmailConfig {
    pub client_id: String,

    pub client_secret: Option<String>,

    pub client_secret_env: Option<String>,

    pub refresh_token: Option<String>,

    pub refresh_token_env: Option<String>,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,
}

fn default_token_url() -> String {
    DEFAULT_GOOGLE_TOKEN_URL.into()
}
fn default_gmail_api_base() -> String {
    DEFAULT_GMAIL_API_BASE.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pskrot", "pskrot").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.yaml");
            p
        },
        |dirs| dirs.config_dir().join("config.yaml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pskrot");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` with `PSKROT_` environment overrides.
///
/// Nested keys use `__`, e.g. `PSKROT_XIQ__TOKEN` or `PSKROT_EMAIL__TRANSPORT`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io(e)
        }
    })?;

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::string(&yaml))
        .merge(Env::prefixed("PSKROT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Look up a secret: named env var, then keyring entry `key`, then plaintext.
fn resolve_secret(key: &str, env_name: Option<&str>, plaintext: Option<&str>) -> Option<SecretString> {
    // 1. Env var
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            if !val.is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, key) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    plaintext
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_owned()))
}

/// Resolve the controller credential. A token wins over a username/password pair.
pub fn resolve_credential(xiq: &XiqConfig) -> Result<Credential, ConfigError> {
    if let Some(token) = resolve_secret("xiq/token", xiq.token_env.as_deref(), xiq.token.as_deref()) {
        return Ok(Credential::Token(token));
    }

    let Some(username) = xiq.username.clone().filter(|u| !u.is_empty()) else {
        return Err(ConfigError::NoCredentials {
            what: "XIQ (set xiq.token or xiq.username/password)".into(),
        });
    };
    let password = resolve_secret(
        &format!("xiq/{username}"),
        xiq.password_env.as_deref(),
        xiq.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        what: format!("XIQ user {username}"),
    })?;

    Ok(Credential::Login { username, password })
}

// ── Translation to typed settings ───────────────────────────────────

/// Build the API client settings. The credential is resolved separately.
pub fn client_config(cfg: &Config) -> Result<ClientConfig, ConfigError> {
    let base_url: Url = cfg
        .xiq
        .base_url
        .parse()
        .map_err(|_| invalid("xiq.base_url", format!("invalid URL: {}", cfg.xiq.base_url)))?;

    let tls = if cfg.xiq.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.xiq.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    if cfg.retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be at least 1"));
    }

    Ok(ClientConfig {
        base_url,
        transport: TransportConfig {
            tls,
            timeout: Duration::from_secs(cfg.xiq.timeout),
        },
        retry: cfg.retry.policy(),
        lro_delay: Duration::from_secs(cfg.lro_delay_secs),
    })
}

/// Build the workflow settings.
pub fn rotation_settings(cfg: &Config) -> Result<RotationSettings, ConfigError> {
    let ssid_id = cfg
        .ssid_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| invalid("ssid_id", "an SSID id is required"))?;

    if cfg.page_size == 0 {
        return Err(invalid("page_size", "must be at least 1"));
    }

    let email = &cfg.email;
    if email.transport != EmailTransport::Disabled {
        if email.sender.is_empty() {
            return Err(invalid("email.sender", "required when email is enabled"));
        }
        if email.recipients.is_empty() {
            return Err(invalid("email.recipients", "at least one recipient is required"));
        }
    }

    Ok(RotationSettings {
        ssid_id,
        queue_file: cfg.queue_file.clone(),
        allow_mismatched: cfg.allow_mismatched,
        allow_config_push: cfg.allow_config_push,
        reuse_keys: cfg.reuse_keys,
        mismatch_wait: Duration::from_secs(cfg.mismatch_wait_secs),
        page_size: cfg.page_size,
        location_id: cfg.location_id,
        email: EmailSettings {
            subject: email.subject.clone(),
            success_message: email.success_message.clone(),
            sender: email.sender.clone(),
            recipients: email.recipients.clone(),
            support_recipients: email.support_recipients.clone(),
        },
    })
}

/// Select and resolve the notification transport.
pub fn notifier_settings(cfg: &Config) -> Result<NotifierSettings, ConfigError> {
    match cfg.email.transport {
        EmailTransport::Disabled => Ok(NotifierSettings::Disabled),
        EmailTransport::Smtp => {
            let smtp = cfg
                .email
                .smtp
                .as_ref()
                .ok_or_else(|| invalid("email.smtp", "required when transport is smtp"))?;
            let password = resolve_secret(
                &format!("smtp/{}", smtp.username),
                smtp.password_env.as_deref(),
                smtp.password.as_deref(),
            )
            .ok_or_else(|| ConfigError::NoCredentials {
                what: format!("SMTP user {}", smtp.username),
            })?;

            Ok(NotifierSettings::Smtp(SmtpSettings {
                server: smtp.server.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password,
            }))
        }
        EmailTransport::Gmail => {
            let gmail = cfg
                .email
                .gmail
                .as_ref()
                .ok_or_else(|| invalid("email.gmail", "required when transport is gmail"))?;
            let client_secret = resolve_secret(
                "gmail/client-secret",
                gmail.client_secret_env.as_deref(),
                gmail.client_secret.as_deref(),
            )
            .ok_or_else(|| ConfigError::NoCredentials {
                what: "Gmail client secret".into(),
            })?;
            let refresh_token = resolve_secret(
                "gmail/refresh-token",
                gmail.refresh_token_env.as_deref(),
                gmail.refresh_token.as_deref(),
            )
            .ok_or_else(|| ConfigError::NoCredentials {
                what: "Gmail refresh token".into(),
            })?;

            Ok(NotifierSettings::Gmail(GmailSettings {
                client_id: gmail.client_id.clone(),
                client_secret,
                refresh_token,
                token_url: parse_url("email.gmail.token_url", &gmail.token_url)?,
                api_base: parse_url("email.gmail.api_base", &gmail.api_base)?,
            }))
        }
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse()
        .map_err(|e: url::ParseError| invalid(field, format!("invalid URL {raw}: {e}")))
}
