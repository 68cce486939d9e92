use thiserror::Error;

/// Top-level error type for the `pskrot-api` crate.
///
/// The first group of variants classifies a single HTTP exchange. The
/// second group is produced by the retrying layer and is what callers
/// usually see: once the retry budget is spent, every fault surfaces as
/// one of `RetriesExhausted`, `Aborted`, or `Api`.
#[derive(Debug, Error)]
pub enum Error {
    // ── Single call ─────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from the controller.
    #[error("HTTP status {status}{}", detail_suffix(.message))]
    HttpStatus { status: u16, message: Option<String> },

    /// Response body was not valid JSON, with the raw body for debugging.
    #[error("Unable to parse response body: {message}")]
    Decode { message: String, body: String },

    /// The controller refused an async POST with an explicit error message.
    #[error("Request rejected by controller (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Login failed or the supplied token could not be used.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A `202 Accepted` response arrived without a `Location` header.
    #[error("{operation}: controller accepted the request but returned no Location header")]
    MissingLocation { operation: String },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Retrying layer ──────────────────────────────────────────────
    /// Every attempt failed with a retryable error.
    #[error("Failed to {operation} after {attempts} attempts")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    /// A non-retryable error stopped the retry loop early.
    #[error("API call to {operation} failed: {source}")]
    Aborted {
        operation: String,
        #[source]
        source: Box<Error>,
    },

    /// HTTP 200 whose body carried a structured `error` object.
    #[error("API failed to {operation}: error code {}: {message}", .code.as_deref().unwrap_or("unknown"))]
    Api {
        operation: String,
        code: Option<String>,
        message: String,
    },
}

fn detail_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl Error {
    /// Returns `true` if a fresh attempt of the same call might succeed.
    ///
    /// Only faults of a single exchange qualify: transport, status, decode.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::HttpStatus { .. } | Self::Decode { .. }
        )
    }

    /// Returns `true` for the failures the retrying layer reports to callers.
    pub fn is_api_call_failed(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. } | Self::Aborted { .. } | Self::Api { .. }
        )
    }

    /// Returns `true` if the controller rejected the credentials.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::HttpStatus { status, .. } => *status == 401,
            Self::RetriesExhausted { last, .. } => last.is_auth(),
            Self::Aborted { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// HTTP status carried by this error or the error it wraps, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::RetriesExhausted { last, .. } => last.status(),
            Self::Aborted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
