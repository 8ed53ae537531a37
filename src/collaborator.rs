// 🤝 Collaborator Contract - What the presentation layer provides
// The engine never touches a screen. Progress, log lines and the two prompts
// (manual column choice, output destination) all go through this trait, so
// the pipeline runs identically under a GUI, a console, or a test harness.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log event severity, as rendered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn name(&self) -> &str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Implemented by whoever drives the engine (GUI thread, console, tests).
///
/// The engine calls these synchronously at pipeline checkpoints; the
/// implementation is responsible for marshalling to an interactive thread
/// if it has one.
pub trait Collaborator {
    /// Ask the operator to pick a column by index when detection fails.
    /// `None` means the operator declined - the run is cancelled.
    fn prompt_column_choice(&self, purpose: &str, columns: &[String]) -> Option<usize>;

    /// Ask for an output file path. `None` cancels persistence (and the run
    /// reports Cancelled, not an error).
    fn prompt_save_path(&self) -> Option<PathBuf>;

    /// Progress checkpoint, 0-100.
    fn report_progress(&self, percent: u8, status: &str);

    /// One log line for the operator.
    fn log_event(&self, message: &str, severity: Severity);
}

/// Collaborator that answers nothing and swallows all output.
///
/// Used by tests and by callers that run the pipeline headless with a fully
/// resolved configuration.
#[derive(Debug, Default)]
pub struct NullCollaborator;

impl Collaborator for NullCollaborator {
    fn prompt_column_choice(&self, _purpose: &str, _columns: &[String]) -> Option<usize> {
        None
    }

    fn prompt_save_path(&self) -> Option<PathBuf> {
        None
    }

    fn report_progress(&self, _percent: u8, _status: &str) {}

    fn log_event(&self, _message: &str, _severity: Severity) {}
}
