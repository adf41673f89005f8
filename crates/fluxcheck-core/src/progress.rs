use std::path::Path;

/// How a file's check ended, as shown on its progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Passed,
    Skipped,
    Failed,
}

/// Receives per-file progress from [`crate::run`].
///
/// The CLI draws spinners; tests use [`SilentProgress`].
pub trait ProgressReporter: Send + Sync {
    fn start_file(&self, input: &Path) -> Box<dyn TaskHandle>;
}

/// Progress line for one input file.
pub trait TaskHandle: Send + Sync {
    /// Describe the step now running, e.g. `pulling redis 17.0.0`.
    fn set_message(&self, message: &str);
    fn finish(&self, status: TaskStatus, message: &str);
}

pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start_file(&self, _input: &Path) -> Box<dyn TaskHandle> {
        Box::new(SilentTaskHandle)
    }
}

struct SilentTaskHandle;

impl TaskHandle for SilentTaskHandle {
    fn set_message(&self, _message: &str) {}
    fn finish(&self, _status: TaskStatus, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_progress_accepts_every_status() {
        let progress = SilentProgress;
        for status in [TaskStatus::Passed, TaskStatus::Skipped, TaskStatus::Failed] {
            let task = progress.start_file(Path::new("apps/redis.yaml"));
            task.set_message("validating redis 17.0.0");
            task.finish(status, "apps/redis.yaml");
        }
    }
}
