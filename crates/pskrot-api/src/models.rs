// Wire types for the XIQ REST API.
//
// Responses are decoded leniently: only the fields the rotator relies on
// are required, everything else is optional.

use serde::{Deserialize, Deserializer, Serialize};

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// 1-based index of this page, when the controller echoes it.
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub count: Option<u32>,
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A managed device as listed by `GET /devices`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config_mismatch: bool,
    #[serde(default)]
    pub connected: Option<bool>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub device_function: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Deployments ─────────────────────────────────────────────────────

/// Body of `POST /deployments`.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRequest {
    pub devices: DeviceIds,
    pub policy: DeploymentPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceIds {
    pub ids: Vec<i64>,
}

/// Deployment policy. The rotator only ever pushes the configuration
/// delta and never touches firmware.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentPolicy {
    pub enable_complete_configuration_update: bool,
    pub firmware_upgrade_policy: FirmwareUpgradePolicy,
    pub firmware_activate_option: FirmwareActivateOption,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirmwareUpgradePolicy {
    pub enable_enforce_upgrade: bool,
    pub enable_distributed_upgrade: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirmwareActivateOption {
    pub enable_activate_at_next_reboot: bool,
    pub activation_delay_seconds: u64,
    pub activation_time: u64,
}

impl DeploymentRequest {
    /// Delta configuration push to the given devices.
    pub fn delta(ids: Vec<i64>) -> Self {
        Self {
            devices: DeviceIds { ids },
            policy: DeploymentPolicy::default(),
        }
    }
}

// ── Long-running operations ─────────────────────────────────────────

/// Response of a GET on an LRO `Location`.
#[derive(Debug, Clone, Deserialize)]
pub struct LroResponse {
    pub metadata: LroMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LroMetadata {
    pub status: String,
    #[serde(default)]
    pub done: Option<bool>,
}

// ── PSK change ──────────────────────────────────────────────────────

/// Outcome of a PSK change.
///
/// Unlike the other operations, a failed change is reported as a value so
/// the rotation workflow can branch without an error path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum PskChange {
    Changed,
    Failed { reason: String },
}

impl PskChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn delta_deployment_serializes_fixed_policy() {
        let body = serde_json::to_value(DeploymentRequest::delta(vec![11, 12])).unwrap();
        assert_eq!(
            body,
            json!({
                "devices": { "ids": [11, 12] },
                "policy": {
                    "enable_complete_configuration_update": false,
                    "firmware_upgrade_policy": {
                        "enable_enforce_upgrade": false,
                        "enable_distributed_upgrade": false
                    },
                    "firmware_activate_option": {
                        "enable_activate_at_next_reboot": false,
                        "activation_delay_seconds": 0,
                        "activation_time": 0
                    }
                }
            })
        );
    }

    #[test]
    fn device_tolerates_sparse_records() {
        let device: Device = serde_json::from_value(json!({ "id": 7, "hostname": "ap-lobby" })).unwrap();
        assert_eq!(device.hostname, "ap-lobby");
        assert!(!device.config_mismatch);
        assert_eq!(device.connected, None);
    }

    #[test]
    fn device_tolerates_null_fields() {
        let page: Page<Device> = serde_json::from_value(json!({
            "total_pages": 1,
            "data": [
                { "id": 7, "hostname": null, "config_mismatch": null },
                { "id": 8, "hostname": "ap-lab", "config_mismatch": true }
            ]
        }))
        .unwrap();

        assert_eq!(page.data[0].hostname, "");
        assert!(!page.data[0].config_mismatch);
        assert_eq!(page.data[1].hostname, "ap-lab");
        assert!(page.data[1].config_mismatch);
    }
}
