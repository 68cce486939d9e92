//! CLI-side configuration helpers: resolve `--config`, load, connect.

use std::path::PathBuf;

use tracing::debug;

use pskrot_api::XiqClient;
use pskrot_config::{Config, client_config, config_path, load_config, resolve_credential};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config` / `PSKROT_CONFIG`, else the platform default path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = active_config_path(global);
    debug!(path = %path.display(), "loading configuration");
    Ok(load_config(&path)?)
}

/// Resolve the credential and build an authenticated client.
pub async fn connect(cfg: &Config) -> Result<XiqClient, CliError> {
    let client_cfg = client_config(cfg)?;
    let credential = resolve_credential(&cfg.xiq)?;
    debug!(base_url = %client_cfg.base_url, "connecting to ExtremeCloud IQ");
    Ok(XiqClient::connect(&client_cfg, &credential).await?)
}
