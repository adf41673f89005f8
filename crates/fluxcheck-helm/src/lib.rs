mod command;
mod kustomize;
pub mod oci;
mod pull;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use command::{CommandLine, ToolOutput, run};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` exited with {status}")]
    Failed {
        command: String,
        status: String,
        /// Combined stdout and stderr of the process, unmodified.
        output: String,
    },
}

impl ToolError {
    /// Diagnostic text for the report: the raw tool output for a failed
    /// process, the error message otherwise.
    pub fn detail(&self) -> String {
        match self {
            ToolError::Failed { output, .. } if !output.trim().is_empty() => output.clone(),
            other => other.to_string(),
        }
    }
}

/// Coordinates of a chart to pull: repository (or OCI registry) URL,
/// chart name and version.
#[derive(Debug, Clone, Copy)]
pub struct PullSpec<'a> {
    pub repository: &'a str,
    pub chart: &'a str,
    pub version: &'a str,
}

impl PullSpec<'_> {
    pub fn is_oci(&self) -> bool {
        oci::is_oci(self.repository)
    }
}

/// Pull and lint operations against a chart.
pub trait ChartTools: Send + Sync {
    /// Download the chart archive into `workdir`.
    fn pull(
        &self,
        spec: &PullSpec<'_>,
        workdir: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;

    /// Lint `archives` using the values file at `values`.
    fn lint(
        &self,
        values: &Path,
        archives: &[PathBuf],
        workdir: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// Renders a Kustomization directory to a multi-document YAML stream.
pub trait Renderer: Send + Sync {
    fn render(&self, dir: &Path) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// `ChartTools` and `Renderer` backed by the `helm` and `kustomize` binaries.
#[derive(Debug, Clone)]
pub struct HelmCli {
    helm: String,
    kustomize: Vec<String>,
    timeout: Duration,
}

impl HelmCli {
    pub fn new(helm: impl Into<String>, kustomize: Vec<String>, timeout: Duration) -> Self {
        Self {
            helm: helm.into(),
            kustomize,
            timeout,
        }
    }
}

impl ChartTools for HelmCli {
    async fn pull(&self, spec: &PullSpec<'_>, workdir: &Path) -> Result<(), ToolError> {
        let line = CommandLine::new(&self.helm).args(pull::pull_args(spec, workdir));
        run(&line, workdir, self.timeout).await.map(|_| ())
    }

    async fn lint(
        &self,
        values: &Path,
        archives: &[PathBuf],
        workdir: &Path,
    ) -> Result<(), ToolError> {
        let line = CommandLine::new(&self.helm).args(pull::lint_args(values, archives));
        run(&line, workdir, self.timeout).await.map(|_| ())
    }
}

impl Renderer for HelmCli {
    async fn render(&self, dir: &Path) -> Result<String, ToolError> {
        let line = kustomize::render_command(&self.kustomize, dir)?;
        run(&line, dir, self.timeout).await.map(|out| out.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_detail_is_raw_output() {
        let err = ToolError::Failed {
            command: "helm pull".to_string(),
            status: "exit status: 1".to_string(),
            output: "Error: chart \"nope\" not found\n".to_string(),
        };
        assert_eq!(err.detail(), "Error: chart \"nope\" not found\n");
    }

    #[test]
    fn failed_without_output_falls_back_to_message() {
        let err = ToolError::Failed {
            command: "helm lint".to_string(),
            status: "exit status: 1".to_string(),
            output: "  \n".to_string(),
        };
        assert_eq!(err.detail(), "`helm lint` exited with exit status: 1");
    }

    #[test]
    fn timeout_message_names_command() {
        let err = ToolError::Timeout {
            command: "kustomize build apps".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.detail(), "`kustomize build apps` timed out after 30s");
    }

    #[test]
    fn pull_spec_detects_oci() {
        let spec = PullSpec {
            repository: "oci://ghcr.io/stefanprodan/charts",
            chart: "podinfo",
            version: "6.5.0",
        };
        assert!(spec.is_oci());

        let spec = PullSpec {
            repository: "https://charts.bitnami.com/bitnami",
            ..spec
        };
        assert!(!spec.is_oci());
    }
}
