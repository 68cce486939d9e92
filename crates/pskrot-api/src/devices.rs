// Device listing
//
// `GET /devices` is paginated by page number. The page count is taken
// from the first response and trusted for the rest of the walk.

use std::time::Duration;

use tracing::{debug, info};

use crate::client::XiqClient;
use crate::error::Error;
use crate::models::{Device, Page};

/// Default page size for device listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Filters and pacing for a device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceQuery {
    pub page_size: u32,
    pub connected: Option<bool>,
    pub config_mismatch: Option<bool>,
    pub location_id: Option<i64>,
    /// Delay before the first request, for rate-limit avoidance.
    pub wait: Duration,
}

impl Default for DeviceQuery {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            connected: None,
            config_mismatch: None,
            location_id: None,
            wait: Duration::ZERO,
        }
    }
}

impl DeviceQuery {
    /// Connected devices whose running configuration differs from policy.
    pub fn mismatched() -> Self {
        Self {
            connected: Some(true),
            config_mismatch: Some(true),
            ..Self::default()
        }
    }

    /// All connected devices.
    pub fn online() -> Self {
        Self {
            connected: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn location(mut self, location_id: Option<i64>) -> Self {
        self.location_id = location_id;
        self
    }

    #[must_use]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    fn label(&self) -> &'static str {
        match (self.connected, self.config_mismatch) {
            (_, Some(true)) => "collect mismatched devices",
            (Some(true), _) => "collect online devices",
            _ => "collect devices",
        }
    }
}

impl XiqClient {
    /// List every device matching `query`, walking all pages.
    ///
    /// `GET /devices?views=FULL&page={n}&limit={page_size}[&connected=..][&configMismatch=..][&locationId=..]`
    pub async fn list_devices(&self, query: &DeviceQuery) -> Result<Vec<Device>, Error> {
        let operation = query.label();
        if !query.wait.is_zero() {
            info!(wait = ?query.wait, "waiting before listing devices");
            tokio::time::sleep(query.wait).await;
        }

        let mut devices = Vec::new();
        let mut page = 1;
        let mut page_count = 1;

        while page <= page_count {
            let url = self.devices_url(query, page)?;
            let body = self.get(operation, &url).await?;
            let raw = body.to_string();
            let batch: Page<Device> = serde_json::from_value(body).map_err(|e| Error::Decode {
                message: format!("{operation}: {e}"),
                body: raw,
            })?;

            if page == 1 {
                page_count = batch.total_pages;
            }
            debug!(page, total_pages = batch.total_pages, received = batch.data.len(), "collected device page");
            devices.extend(batch.data);
            page += 1;
        }

        Ok(devices)
    }

    /// Connected devices with a configuration mismatch.
    pub async fn list_mismatched_devices(
        &self,
        page_size: u32,
        location_id: Option<i64>,
        wait: Duration,
    ) -> Result<Vec<Device>, Error> {
        let query = DeviceQuery::mismatched()
            .page_size(page_size)
            .location(location_id)
            .wait(wait);
        self.list_devices(&query).await
    }

    /// All connected devices.
    pub async fn list_online_devices(
        &self,
        page_size: u32,
        location_id: Option<i64>,
    ) -> Result<Vec<Device>, Error> {
        let query = DeviceQuery::online().page_size(page_size).location(location_id);
        self.list_devices(&query).await
    }

    fn devices_url(&self, query: &DeviceQuery, page: u32) -> Result<url::Url, Error> {
        let mut url = self.url("devices")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("views", "FULL")
                .append_pair("page", &page.to_string())
                .append_pair("limit", &query.page_size.to_string());
            if let Some(connected) = query.connected {
                pairs.append_pair("connected", &connected.to_string());
            }
            if let Some(mismatch) = query.config_mismatch {
                pairs.append_pair("configMismatch", &mismatch.to_string());
            }
            if let Some(location_id) = query.location_id {
                pairs.append_pair("locationId", &location_id.to_string());
            }
        }
        Ok(url)
    }
}
