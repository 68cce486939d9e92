//! `pskrot mismatches` / `pskrot devices`: connected device listings.

use tabled::Tabled;

use pskrot_api::{Device, DeviceQuery};

use crate::cli::{GlobalOpts, ListArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Mismatch")]
    mismatch: String,
}

fn row(d: &Device, color: bool) -> DeviceRow {
    DeviceRow {
        id: d.id,
        hostname: d.hostname.clone(),
        serial: d.serial_number.clone().unwrap_or_default(),
        mac: d.mac_address.clone().unwrap_or_default(),
        function: d.device_function.clone().unwrap_or_default(),
        mismatch: output::yes_no(d.config_mismatch, color),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn mismatches(args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    list(DeviceQuery::mismatched(), args, global).await
}

pub async fn online(args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    list(DeviceQuery::online(), args, global).await
}

async fn list(query: DeviceQuery, args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let client = config::connect(&cfg).await?;

    let query = query
        .page_size(args.page_size.unwrap_or(cfg.page_size))
        .location(args.location.or(cfg.location_id));
    let devices = client.list_devices(&query).await?;

    let color = output::should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &devices,
        |d| row(d, color),
        |d| d.hostname.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
