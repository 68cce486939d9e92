// SSID pre-shared key endpoint

use tracing::{debug, warn};

use crate::client::XiqClient;
use crate::error::Error;
use crate::models::PskChange;

impl XiqClient {
    /// Replace the PSK of an SSID.
    ///
    /// `PUT /ssids/{ssid_id}/psk/password` with the raw key as the body.
    /// API-level failures are folded into [`PskChange::Failed`]; only a
    /// malformed SSID id (invalid URL) is returned as an error.
    pub async fn change_psk(&self, ssid_id: &str, psk: &str) -> Result<PskChange, Error> {
        let url = self.url(&format!("ssids/{ssid_id}/psk/password"))?;
        debug!(ssid_id, "changing PSK");

        match self.put("change psk", &url, psk).await {
            Ok(_) => Ok(PskChange::Changed),
            Err(err) if err.is_api_call_failed() => {
                warn!(ssid_id, error = %err, "PSK change failed");
                Ok(PskChange::Failed {
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}
