//! `pskrot queue`: inspect the PSK queue file without touching the controller.

use serde::Serialize;

use pskrot_core::PskQueue;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Never carries key material.
#[derive(Serialize)]
struct QueueSummary {
    path: String,
    remaining: usize,
    reuse_keys: bool,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let queue = PskQueue::load(&cfg.queue_file)?;

    let summary = QueueSummary {
        path: queue.path().display().to_string(),
        remaining: queue.len(),
        reuse_keys: cfg.reuse_keys,
    };
    let color = output::should_color(&global.color);

    let rendered = output::render_single(
        &global.output,
        &summary,
        |s| {
            format!(
                "{} {}\n{} {}\n{} {}",
                output::label("File:     ", color),
                s.path,
                output::label("Remaining:", color),
                s.remaining,
                output::label("Reuse:    ", color),
                output::yes_no(s.reuse_keys, color),
            )
        },
        |s| s.remaining.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
