// ── Workflow error types ──
//
// Terminal failures of a rotation run. A failed PSK change is not here:
// it is a branch of the workflow, reported through `RotationOutcome`.

use std::path::PathBuf;

use thiserror::Error;

use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Queue ────────────────────────────────────────────────────────
    #[error("File {} does not exist.", .path.display())]
    QueueMissing { path: PathBuf },

    #[error("The PSK CSV file {} is empty", .path.display())]
    QueueEmpty { path: PathBuf },

    #[error(transparent)]
    Queue(#[from] QueueError),

    // ── Controller state ─────────────────────────────────────────────
    #[error("{} device(s) are in a mismatched state; PSK will not be changed", .hostnames.len())]
    MismatchBlocked { hostnames: Vec<String> },

    #[error(transparent)]
    Api(#[from] pskrot_api::Error),
}

impl CoreError {
    /// Whether the failure came from the controller API.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    /// Whether the failure concerns the PSK queue file.
    pub fn is_queue(&self) -> bool {
        matches!(
            self,
            Self::QueueMissing { .. } | Self::QueueEmpty { .. } | Self::Queue(_)
        )
    }
}
