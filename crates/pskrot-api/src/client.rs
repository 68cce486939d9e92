// XIQ REST client
//
// Wraps `reqwest::Client` with URL construction, response classification,
// and the retry loop every controller operation goes through. Endpoint
// groups (devices, psk, deployments, login) are implemented as inherent
// methods in separate files to keep this module focused on call mechanics.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LOCATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::Credential;
use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;

/// Public ExtremeCloud IQ API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.extremecloudiq.com";

/// Wait between accepting an async deployment and checking its status.
pub const DEFAULT_LRO_DELAY: Duration = Duration::from_secs(60);

/// Error body returned with non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_message: Option<String>,
}

/// Raw outcome of a POST that passed status classification.
#[derive(Debug)]
pub(crate) struct PostResponse {
    pub status: StatusCode,
    /// `Location` header of a `202 Accepted` response.
    pub location: Option<String>,
    pub body: Value,
}

/// Everything needed to build a [`XiqClient`] besides the credential.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub transport: TransportConfig,
    pub retry: RetryPolicy,
    pub lro_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            transport: TransportConfig::default(),
            retry: RetryPolicy::default(),
            lro_delay: DEFAULT_LRO_DELAY,
        }
    }
}

/// HTTP client for the ExtremeCloud IQ REST API.
///
/// Every public operation goes through a retrying GET/PUT/POST helper that
/// classifies the response, retries transient faults under the configured
/// [`RetryPolicy`], and rejects 200 bodies carrying an `error` object.
pub struct XiqClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    lro_delay: Duration,
}

impl XiqClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build an authenticated client.
    ///
    /// A bearer token is installed directly as the default `Authorization`
    /// header. A username/password pair performs a session login first and
    /// installs the returned access token instead.
    pub async fn connect(config: &ClientConfig, credential: &Credential) -> Result<Self, Error> {
        let token = match credential {
            Credential::Token(token) => token.clone(),
            Credential::Login { username, password } => {
                let anonymous = Self::with_client(
                    config.transport.build_client()?,
                    config.base_url.clone(),
                )
                .with_retry_policy(config.retry);
                anonymous.login(username, password).await?
            }
        };

        let http = config
            .transport
            .build_client_with_headers(bearer_headers(&token)?)?;

        Ok(Self::with_client(http, config.base_url.clone())
            .with_retry_policy(config.retry)
            .with_lro_delay(config.lro_delay))
    }

    /// Wrap a pre-built `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            retry: RetryPolicy::default(),
            lro_delay: DEFAULT_LRO_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_lro_delay(mut self, delay: Duration) -> Self {
        self.lro_delay = delay;
        self
    }

    /// The API base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn lro_delay(&self) -> Duration {
        self.lro_delay
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Resolve a relative path (e.g. `"devices"`) or an absolute URL
    /// (e.g. an LRO `Location`) against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        match Url::parse(path) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(self.base_url.join(path.trim_start_matches('/'))?)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── Retrying verbs ───────────────────────────────────────────────

    /// GET with retries; the body is checked for an embedded `error`.
    pub(crate) async fn get(&self, operation: &str, url: &Url) -> Result<Value, Error> {
        let body = self.retrying(operation, || self.get_once(url)).await?;
        check_embedded_error(operation, &body)?;
        Ok(body)
    }

    /// PUT a raw body with retries.
    pub(crate) async fn put(&self, operation: &str, url: &Url, body: &str) -> Result<Value, Error> {
        let body = self.retrying(operation, || self.put_once(url, body)).await?;
        check_embedded_error(operation, &body)?;
        Ok(body)
    }

    /// POST a JSON body with retries. `202 Accepted` is a success.
    pub(crate) async fn post(
        &self,
        operation: &str,
        url: &Url,
        body: &Value,
    ) -> Result<PostResponse, Error> {
        let resp = self.retrying(operation, || self.post_once(url, body)).await?;
        check_embedded_error(operation, &resp.body)?;
        Ok(resp)
    }

    /// Drive `call` under the retry policy.
    ///
    /// Retryable faults are logged and retried after the policy's backoff;
    /// anything else aborts immediately. Exhausting the budget yields
    /// [`Error::RetriesExhausted`] carrying the last fault.
    async fn retrying<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if self.retry.is_retryable(&err) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %err,
                        "API call failed"
                    );
                    if attempt >= max_attempts {
                        error!(operation, attempts = attempt, "retry budget exhausted, cannot continue");
                        return Err(Error::RetriesExhausted {
                            operation: operation.to_owned(),
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.retry.backoff(attempt);
                    if !delay.is_zero() {
                        debug!(operation, ?delay, "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    error!(operation, error = %err, "API call failed with non-retryable error");
                    return Err(Error::Aborted {
                        operation: operation.to_owned(),
                        source: Box::new(err),
                    });
                }
            }
        }
    }

    // ── Single calls ─────────────────────────────────────────────────

    async fn get_once(&self, url: &Url) -> Result<Value, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url.clone()).send().await.map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(url, status, resp, false).await);
        }
        read_json(url, resp).await
    }

    async fn put_once(&self, url: &Url, body: &str) -> Result<Value, Error> {
        debug!("PUT {url}");
        let resp = self
            .http
            .put(url.clone())
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(url, status, resp, false).await);
        }
        read_json(url, resp).await
    }

    async fn post_once(&self, url: &Url, body: &Value) -> Result<PostResponse, Error> {
        debug!("POST {url}");
        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if status == StatusCode::ACCEPTED {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            debug!(?location, "request accepted, operation pending");
            return Ok(PostResponse {
                status,
                location,
                body: Value::Null,
            });
        }
        if !status.is_success() {
            return Err(status_error(url, status, resp, true).await);
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = read_json(url, resp).await?;
        Ok(PostResponse {
            status,
            location,
            body,
        })
    }
}

// ── Response classification ─────────────────────────────────────────

fn bearer_headers(token: &SecretString) -> Result<HeaderMap, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())).map_err(
        |e| Error::Authentication {
            message: format!("invalid token header value: {e}"),
        },
    )?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Ensure the base path ends with `/` so relative joins append.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn transport_error(url: &Url, err: reqwest::Error) -> Error {
    error!(%url, error = %err, "HTTP transport error");
    Error::Transport(err)
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Read the body and parse it as JSON. An empty body decodes as `null`.
async fn read_json(url: &Url, resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport_error(url, e))?;
    decode_json(url, status, body)
}

fn decode_json(url: &Url, status: StatusCode, body: String) -> Result<Value, Error> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| {
        error!(%url, status = status.as_u16(), "unable to parse JSON response");
        Error::Decode {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        }
    })
}

/// Classify a non-2xx response.
///
/// The error body is decoded for diagnostics only; a body that is not
/// JSON is logged raw. With `reject_on_message`, a decoded
/// `error_message` turns the fault into a non-retryable rejection.
async fn status_error(
    url: &Url,
    status: StatusCode,
    resp: reqwest::Response,
    reject_on_message: bool,
) -> Error {
    error!(%url, status = status.as_u16(), "controller returned error status");

    let raw = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(body) => body.error_message,
        Err(_) => {
            if !raw.is_empty() {
                warn!(%url, body = %preview(&raw), "error body is not JSON");
            }
            None
        }
    };
    if let Some(ref message) = message {
        warn!(%url, %message, "controller error message");
    }

    match message {
        Some(message) if reject_on_message => Error::Rejected {
            status: status.as_u16(),
            message,
        },
        message => Error::HttpStatus {
            status: status.as_u16(),
            message,
        },
    }
}

/// XIQ reports some failures as `{"error": {"error_id": .., "error_message": ..}}`
/// with HTTP 200. Any non-empty `error` value fails the call, with or
/// without a message.
fn check_embedded_error(operation: &str, body: &Value) -> Result<(), Error> {
    let Some(err) = body.get("error") else {
        return Ok(());
    };
    let present = match err {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    };
    if !present {
        return Ok(());
    }

    let message = err
        .get("error_message")
        .and_then(Value::as_str)
        .or_else(|| err.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or("unknown error");

    let code = err
        .get("error_id")
        .or_else(|| err.get("error_code"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });

    error!(operation, code = ?code, %message, "controller reported an error in a successful response");
    Err(Error::Api {
        operation: operation.to_owned(),
        code,
        message: message.to_owned(),
    })
}
