// pskrot-api: async client for the ExtremeCloud IQ REST API
//
// Covers exactly what PSK rotation needs: session login, device listing,
// SSID PSK changes, and asynchronous configuration deployments, all behind
// one retrying call wrapper.

pub mod auth;
pub mod client;
pub mod devices;
pub mod deployments;
pub mod error;
pub mod models;
pub mod psk;
pub mod retry;
pub mod transport;

pub use auth::Credential;
pub use client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_LRO_DELAY, XiqClient};
pub use devices::{DEFAULT_PAGE_SIZE, DeviceQuery};
pub use error::Error;
pub use models::{Device, Page, PskChange};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{TlsMode, TransportConfig};
