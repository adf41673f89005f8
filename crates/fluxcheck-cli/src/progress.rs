use std::path::Path;
use std::time::Duration;

use fluxcheck_core::progress::{ProgressReporter, TaskHandle, TaskStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::style;

/// Draws one `indicatif` spinner per input file on stderr.
pub struct IndicatifReporter {
    multi: MultiProgress,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start_file(&self, input: &Path) -> Box<dyn TaskHandle> {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_prefix(input.display().to_string());
        pb.set_message(style::dim("queued"));
        pb.enable_steady_tick(Duration::from_millis(80));
        Box::new(FileLine { pb })
    }
}

struct FileLine {
    pb: ProgressBar,
}

impl TaskHandle for FileLine {
    fn set_message(&self, message: &str) {
        self.pb.set_message(style::dim(message));
    }

    fn finish(&self, status: TaskStatus, message: &str) {
        let message = match status {
            TaskStatus::Skipped => style::dim(message),
            TaskStatus::Passed | TaskStatus::Failed => message.to_string(),
        };
        let mark = style::status_mark(status);
        if let Ok(plain) = ProgressStyle::with_template("{msg}") {
            self.pb.set_style(plain);
        }
        self.pb.finish_with_message(format!("{mark} {message}"));
    }
}
