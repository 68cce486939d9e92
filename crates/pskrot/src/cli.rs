//! Clap derive structures for the `pskrot` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pskrot -- rotate an ExtremeCloud IQ SSID pre-shared key from a queue file
#[derive(Debug, Parser)]
#[command(
    name = "pskrot",
    version,
    about = "Rotate ExtremeCloud IQ SSID pre-shared keys",
    long_about = "Rotates the PSK of one ExtremeCloud IQ SSID to the next key of a CSV queue,\n\
        optionally pushes the configuration to online devices, and emails the result.\n\n\
        Rotation is refused while devices report a configuration mismatch unless\n\
        allow_mismatched is set.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (default: platform config dir / config.yaml)
    #[arg(long, short = 'c', env = "PSKROT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, env = "PSKROT_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rotate the SSID PSK to the next key in the queue
    Rotate(RotateArgs),

    /// List connected devices with a configuration mismatch
    #[command(alias = "mm")]
    Mismatches(ListArgs),

    /// List connected devices
    #[command(alias = "dev", alias = "d")]
    Devices(ListArgs),

    /// Show the queue file and how many keys remain
    Queue,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RotateArgs {
    /// Do not push the configuration after rotating (overrides allow_config_push)
    #[arg(long)]
    pub no_push: bool,
}

/// Filters shared by the device listings.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only devices in this location (overrides location_id)
    #[arg(long, short = 'L')]
    pub location: Option<i64>,

    /// Devices per page request (overrides page_size)
    #[arg(long, short = 'l')]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
