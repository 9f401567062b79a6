//! Live upload progress
//!
//! Draws a single line, rewritten in place, in the form
//! `total read:<bytes> progress:<percent>%`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mineral_core::{ProgressCallback, ProgressUpdate};

pub struct ProgressLine {
    bar: ProgressBar,
    /// Highest byte count drawn so far
    shown: AtomicU64,
}

impl ProgressLine {
    /// A progress line on stderr, or a hidden one when `enabled` is false
    pub fn new(enabled: bool) -> Arc<Self> {
        let target = if enabled {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(None, target);
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            bar.set_style(style);
        }

        Arc::new(Self {
            bar,
            shown: AtomicU64::new(0),
        })
    }

    /// Callback to hand to the transfer engine
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let line = Arc::clone(self);
        Arc::new(move |update: ProgressUpdate| line.update(update))
    }

    fn update(&self, update: ProgressUpdate) {
        // Reads from concurrent parts can report out of order; never draw a
        // smaller count than one already shown
        let previous = self.shown.fetch_max(update.bytes_read, Ordering::SeqCst);
        if update.bytes_read < previous {
            return;
        }

        self.bar.set_length(update.total_bytes);
        self.bar.set_position(update.bytes_read);
        self.bar.set_message(render(update));
    }

    /// Leave the final line on screen
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Stop drawing after a failure, keeping the last line
    pub fn abandon(&self) {
        self.bar.abandon();
    }

    #[cfg(test)]
    fn message(&self) -> String {
        self.bar.message()
    }
}

pub fn render(update: ProgressUpdate) -> String {
    update.to_string()
}
