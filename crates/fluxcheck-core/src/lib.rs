pub mod index;
pub mod manifest;
pub mod progress;
pub mod report;
pub mod resolve;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fluxcheck_helm::{ChartTools, Renderer};
use tokio::sync::Semaphore;

use crate::index::{IndexOptions, RepositoryIndex};
use crate::progress::{ProgressReporter, TaskHandle, TaskStatus};
use crate::report::{Report, Stage, ValidationOutcome};
use crate::resolve::Resolution;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Resolution(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("repository index: {0}")]
    Index(String),
}

impl CheckError {
    /// Stage a per-file error is reported under.
    pub fn stage(&self) -> Stage {
        match self {
            CheckError::Parse(_) => Stage::Parse,
            CheckError::Resolution(_) => Stage::Resolve,
            CheckError::Io(_) | CheckError::Index(_) => Stage::Internal,
        }
    }
}

pub struct CheckOptions {
    /// Root for repository indexing and the Kustomization search bound.
    pub root: PathBuf,
    /// Files validated concurrently.
    pub jobs: usize,
    /// Directory names skipped while indexing.
    pub exclude: Vec<String>,
}

/// What happened to one input file.
#[derive(Debug)]
enum Verdict {
    NoRelease,
    Skipped(String),
    Checked(Vec<ValidationOutcome>),
}

/// Index `options.root`, then resolve and validate every file in `files`.
///
/// Per-file failures, including panics inside a file's task, land in the
/// returned report. Only an unusable root is an error.
pub async fn run<T>(
    files: &[PathBuf],
    options: &CheckOptions,
    tools: Arc<T>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<Arc<Report>, CheckError>
where
    T: ChartTools + Renderer + 'static,
{
    let root = options
        .root
        .canonicalize()
        .map_err(|e| CheckError::Index(format!("{}: {e}", options.root.display())))?;

    let index = index::build_index(
        &root,
        &IndexOptions {
            exclude: options.exclude.clone(),
        },
    )?;
    tracing::info!(
        repositories = index.len(),
        root = %root.display(),
        "indexed HelmRepository definitions"
    );

    let index = Arc::new(index);
    let root = Arc::new(root);
    let report = Arc::new(Report::new());
    let permits = Arc::new(Semaphore::new(options.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let source = file.clone();
        let file = file.clone();
        let index = index.clone();
        let root = root.clone();
        let tools = tools.clone();
        let report = report.clone();
        let permits = permits.clone();
        let progress = progress.clone();

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let task = progress.start_file(&file);
            let verdict = check_file(&file, &root, &index, tools.as_ref(), task.as_ref()).await;
            settle(&file, verdict, &report, task.as_ref());
        });
        handles.push((source, handle));
    }

    for (file, handle) in handles {
        if let Err(e) = handle.await {
            let detail = if e.is_panic() {
                format!("panicked: {}", panic_message(e.into_panic()))
            } else {
                "task was cancelled".to_string()
            };
            report.record(ValidationOutcome::failed(&file, Stage::Internal, detail));
        }
    }

    Ok(report)
}

/// Parse, resolve and validate a single file.
async fn check_file<T>(
    file: &Path,
    root: &Path,
    index: &RepositoryIndex,
    tools: &T,
    task: &dyn TaskHandle,
) -> Result<Verdict, CheckError>
where
    T: ChartTools + Renderer,
{
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| CheckError::Io(format!("read {}: {e}", file.display())))?;
    let docs = manifest::parse_documents(&content)
        .map_err(|e| CheckError::Parse(format!("invalid YAML: {e}")))?;

    let Some((name, release)) = manifest::first_helm_release(&docs)? else {
        tracing::debug!(file = %file.display(), "no HelmRelease document");
        return Ok(Verdict::NoRelease);
    };

    let absolute = tokio::fs::canonicalize(file)
        .await
        .map_err(|e| CheckError::Io(format!("resolve {}: {e}", file.display())))?;

    task.set_message(&format!("resolving {name}"));
    let chart = match resolve::resolve(&absolute, &name, release, index, tools, root).await? {
        Resolution::Chart(chart) => chart,
        Resolution::Skip(reason) => return Ok(Verdict::Skipped(reason)),
    };
    tracing::debug!(
        release = %name,
        chart = %chart.reference.chart,
        url = %chart.url,
        oci = chart.is_oci(),
        "resolved chart"
    );

    task.set_message(&format!(
        "validating {} {} from {}",
        chart.reference.chart, chart.reference.version, chart.url
    ));
    let outcomes = validate::validate_chart(file, &chart, tools).await?;
    Ok(Verdict::Checked(outcomes))
}

/// Move a file's verdict into the report and close its progress line.
fn settle(
    file: &Path,
    verdict: Result<Verdict, CheckError>,
    report: &Report,
    task: &dyn TaskHandle,
) {
    let label = file.display().to_string();
    match verdict {
        Ok(Verdict::NoRelease) => {
            task.finish(TaskStatus::Skipped, &format!("{label} (no HelmRelease)"))
        }
        Ok(Verdict::Skipped(reason)) => {
            tracing::info!(file = %label, %reason, "skipped");
            task.finish(TaskStatus::Skipped, &format!("{label} ({reason})"));
            report.notice(file, format!("skipped: {reason}"));
        }
        Ok(Verdict::Checked(outcomes)) => {
            let failed = outcomes.iter().find(|o| !o.success).map(|o| o.stage);
            for outcome in outcomes {
                report.record(outcome);
            }
            match failed {
                Some(stage) => {
                    tracing::info!(file = %label, %stage, "failed");
                    task.finish(TaskStatus::Failed, &format!("{label} ({stage} failed)"));
                }
                None => {
                    tracing::info!(file = %label, "validated");
                    task.finish(TaskStatus::Passed, &label);
                }
            }
        }
        Err(e) => {
            let stage = e.stage();
            tracing::info!(file = %label, %stage, "failed: {e}");
            task.finish(TaskStatus::Failed, &format!("{label} ({stage} failed)"));
            report.record(ValidationOutcome::failed(file, stage, e.to_string()));
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
