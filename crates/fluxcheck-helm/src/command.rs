use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use crate::ToolError;

/// A program and its argument vector. Arguments are handed to the OS as-is,
/// never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `line` in `cwd`, killing it once `timeout` elapses.
///
/// A non-zero exit becomes `ToolError::Failed` carrying stdout followed by
/// stderr.
pub async fn run(
    line: &CommandLine,
    cwd: &Path,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let command = line.to_string();
    tracing::debug!(%command, cwd = %cwd.display(), "running external tool");

    let child = tokio::process::Command::new(&line.program)
        .args(&line.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(ToolError::Spawn { command, source }),
        Err(_) => return Err(ToolError::Timeout { command, timeout }),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        tracing::debug!(%command, status = %output.status, "external tool failed");
        return Err(ToolError::Failed {
            command,
            status: output.status.to_string(),
            output: format!("{stdout}{stderr}"),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let line = CommandLine::new("helm")
            .arg("pull")
            .args(["--version", "1.0.0"]);
        assert_eq!(line.to_string(), "helm pull --version 1.0.0");
        assert_eq!(line.program(), "helm");
        assert_eq!(line.arguments().len(), 3);
    }

    #[test]
    fn metacharacters_stay_single_arguments() {
        let line = CommandLine::new("helm").arg("redis; rm -rf /");
        assert_eq!(line.arguments(), &[OsString::from("redis; rm -rf /")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_captures_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let line = CommandLine::new("sh").args(["-c", "echo rendered"]);
        let out = run(&line, tmp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.stdout, "rendered\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_passes_arguments_without_shell() {
        let tmp = tempfile::tempdir().unwrap();
        let line = CommandLine::new("echo").arg("$(whoami) && false");
        let out = run(&line, tmp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.stdout, "$(whoami) && false\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_failure_carries_combined_output() {
        let tmp = tempfile::tempdir().unwrap();
        let line = CommandLine::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let err = run(&line, tmp.path(), Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            ToolError::Failed { output, .. } => {
                assert!(output.contains("out\n"));
                assert!(output.contains("err\n"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let line = CommandLine::new("sleep").arg("5");
        let err = run(&line, tmp.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn run_missing_binary_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let line = CommandLine::new("fluxcheck-definitely-not-installed");
        let err = run(&line, tmp.path(), Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.to_string().contains("fluxcheck-definitely-not-installed"));
    }
}
