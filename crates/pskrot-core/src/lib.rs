//! PSK rotation for ExtremeCloud IQ.
//!
//! - **[`PskQueue`]**: the CSV file of keys waiting to be rotated in,
//!   rewritten atomically after each successful change.
//! - **[`RotationWorkflow`]**: the linear run (mismatch gate, PSK change,
//!   queue persistence, optional configuration push, notification) driven
//!   by an immutable [`RotationSettings`].
//! - **[`Notifier`]**: result delivery over Gmail, SMTP, or the log only.

pub mod error;
pub mod notify;
pub mod queue;
pub mod settings;
pub mod workflow;

pub use error::CoreError;
pub use notify::{AnyNotifier, Notification, Notifier, NotifierSettings, NotifyError};
pub use queue::{PskQueue, QueueError};
pub use settings::{EmailSettings, RotationSettings};
pub use workflow::{PushStatus, RotationOutcome, RotationWorkflow, format_push_status};
