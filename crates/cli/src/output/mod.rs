//! Output formatting for the CLI
//!
//! Commands print through a [`Formatter`] so human and JSON output stay
//! consistent. Upload progress is drawn separately by [`ProgressLine`].

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::ProgressLine;

/// Output settings taken from the global flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub no_color: bool,
    pub quiet: bool,
}
