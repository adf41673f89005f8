use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Step of a file's check that produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Parse,
    Resolve,
    Pull,
    Lint,
    Internal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Resolve => write!(f, "resolve"),
            Self::Pull => write!(f, "helm pull"),
            Self::Lint => write!(f, "helm lint"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub input: PathBuf,
    pub stage: Stage,
    pub success: bool,
    pub detail: String,
}

impl ValidationOutcome {
    pub fn passed(input: &Path, stage: Stage) -> Self {
        Self {
            input: input.to_path_buf(),
            stage,
            success: true,
            detail: String::new(),
        }
    }

    pub fn failed(input: &Path, stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            input: input.to_path_buf(),
            stage,
            success: false,
            detail: detail.into(),
        }
    }
}

/// Informational line for a file that was intentionally not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub input: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
struct Entries {
    failures: Vec<ValidationOutcome>,
    notices: Vec<Notice>,
}

/// Run-wide collection of failures. Safe to share between tasks.
#[derive(Debug, Default)]
pub struct Report {
    entries: Mutex<Entries>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failed outcome. Successes and exact duplicates are ignored.
    pub fn record(&self, outcome: ValidationOutcome) {
        if outcome.success {
            return;
        }
        let mut entries = self.lock();
        if !entries.failures.contains(&outcome) {
            entries.failures.push(outcome);
        }
    }

    pub fn notice(&self, input: &Path, message: impl Into<String>) {
        self.lock().notices.push(Notice {
            input: input.to_path_buf(),
            message: message.into(),
        });
    }

    /// Failures ordered by input, then stage.
    pub fn failures(&self) -> Vec<ValidationOutcome> {
        let mut failures = self.lock().failures.clone();
        failures.sort_by(|a, b| a.input.cmp(&b.input).then(a.stage.cmp(&b.stage)));
        failures
    }

    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = self.lock().notices.clone();
        notices.sort_by(|a, b| a.input.cmp(&b.input));
        notices
    }

    pub fn exit_code(&self) -> u8 {
        if self.lock().failures.is_empty() { 0 } else { 1 }
    }

    /// Write `[INFO]` notices and one `[ERROR] <source>: <message>` line per
    /// failure, then return the process exit code.
    pub fn finalize(&self, out: &mut dyn Write) -> u8 {
        for notice in self.notices() {
            let _ = writeln!(out, "[INFO] {}: {}", notice.input.display(), notice.message);
        }
        for failure in self.failures() {
            let _ = writeln!(
                out,
                "[ERROR] {}: {}: {}",
                failure.input.display(),
                failure.stage,
                failure.detail.trim_end()
            );
        }
        let _ = out.flush();
        self.exit_code()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
