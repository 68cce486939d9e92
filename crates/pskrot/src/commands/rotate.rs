//! `pskrot rotate`: one rotation run.

use serde::Serialize;
use tracing::{error, info};

use pskrot_config::{notifier_settings, rotation_settings};
use pskrot_core::{AnyNotifier, PushStatus, RotationOutcome, RotationWorkflow};

use crate::cli::{GlobalOpts, RotateArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

/// What gets printed. The new key is only ever sent by email.
#[derive(Serialize)]
struct RotationSummary {
    ssid_id: String,
    rotated: bool,
    config_push: Option<String>,
    queue_persisted: bool,
    remaining: usize,
    notified: Vec<String>,
}

impl RotationSummary {
    fn new(ssid_id: &str, outcome: &RotationOutcome) -> Self {
        Self {
            ssid_id: ssid_id.to_owned(),
            rotated: outcome.rotated,
            config_push: outcome.push.as_ref().map(PushStatus::message),
            queue_persisted: outcome.queue_persisted,
            remaining: outcome.remaining,
            notified: outcome.recipients.clone(),
        }
    }
}

fn detail(s: &RotationSummary, color: bool) -> String {
    let mut lines = vec![
        format!("{} {}", output::label("SSID:        ", color), s.ssid_id),
        format!("{} {}", output::label("Rotated:     ", color), output::yes_no(s.rotated, color)),
    ];
    if let Some(ref push) = s.config_push {
        lines.push(format!("{} {push}", output::label("Config push: ", color)));
    }
    lines.push(format!(
        "{} {}",
        output::label("Queue saved: ", color),
        output::yes_no(s.queue_persisted, color)
    ));
    lines.push(format!("{} {}", output::label("Keys left:   ", color), s.remaining));
    if !s.notified.is_empty() {
        lines.push(format!("{} {}", output::label("Notified:    ", color), s.notified.join(", ")));
    }
    lines.join("\n")
}

pub async fn handle(args: RotateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let mut settings = rotation_settings(&cfg)?;
    if args.no_push {
        settings.allow_config_push = false;
    }
    let notifier = AnyNotifier::from_settings(&notifier_settings(&cfg)?, &settings.email.sender)?;
    let workflow = RotationWorkflow::new(settings, notifier);

    // Queue first: an empty or missing file must not cost a login.
    let queue = workflow.load_queue().await?;

    let client = match config::connect(&cfg).await {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "could not connect to ExtremeCloud IQ");
            workflow
                .notify_support(&format!(
                    "Script failed to connect to ExtremeCloud IQ. PSK will not be changed.\n\n{err}"
                ))
                .await;
            return Err(err);
        }
    };

    let outcome = workflow.rotate(&client, queue).await?;
    info!(rotated = outcome.rotated, remaining = outcome.remaining, "rotation finished");

    let summary = RotationSummary::new(&workflow.settings().ssid_id, &outcome);
    let color = output::should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &summary,
        |s| detail(s, color),
        |s| if s.rotated { "rotated".into() } else { "failed".into() },
    )?;
    output::print_output(&rendered, global.quiet);

    if !outcome.rotated {
        return Err(CliError::RotationFailed);
    }
    if !outcome.queue_persisted {
        return Err(CliError::QueueNotPersisted {
            path: workflow.settings().queue_file.display().to_string(),
        });
    }
    Ok(())
}
