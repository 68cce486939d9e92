// Configuration deployments and long-running operation polling
//
// `POST /deployments?async=true` answers `202 Accepted` with a `Location`
// for the long-running operation. The status is checked exactly once after
// a fixed delay; a still-running operation is reported as-is.

use tracing::{debug, info};

use crate::client::XiqClient;
use crate::error::Error;
use crate::models::{DeploymentRequest, LroResponse};

impl XiqClient {
    /// Push the pending configuration delta to `device_ids`.
    ///
    /// Returns the LRO status observed after the configured delay (for
    /// example `SUCCEEDED`, `FAILED`, or `PENDING`).
    pub async fn push_config(&self, device_ids: &[i64]) -> Result<String, Error> {
        let operation = "push delta config update to devices";
        let url = self.url("deployments?async=true")?;
        let body = serde_json::to_value(DeploymentRequest::delta(device_ids.to_vec())).map_err(
            |e| Error::Decode {
                message: format!("failed to encode deployment request: {e}"),
                body: String::new(),
            },
        )?;

        debug!(devices = device_ids.len(), "requesting configuration push");
        let resp = self.post(operation, &url, &body).await?;
        let location = resp.location.ok_or_else(|| Error::MissingLocation {
            operation: operation.to_owned(),
        })?;
        debug!(status = resp.status.as_u16(), %location, "configuration push accepted");

        let delay = self.lro_delay();
        if !delay.is_zero() {
            info!(?delay, "waiting for configuration push to start");
            tokio::time::sleep(delay).await;
        }

        self.check_operation(&location).await
    }

    /// Read the status of a long-running operation once.
    pub async fn check_operation(&self, location: &str) -> Result<String, Error> {
        let url = self.url(location)?;
        let body = self.get("check LRO status", &url).await?;
        let raw = body.to_string();
        let lro: LroResponse = serde_json::from_value(body).map_err(|e| Error::Decode {
            message: format!("check LRO status: {e}"),
            body: raw,
        })?;
        debug!(status = %lro.metadata.status, "LRO status");
        Ok(lro.metadata.status)
    }
}
