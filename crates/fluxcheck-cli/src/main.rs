mod progress;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use fluxcheck_config::{ConfigError, FluxcheckConfig};
use fluxcheck_core::progress::{ProgressReporter, SilentProgress};
use fluxcheck_core::CheckOptions;
use fluxcheck_helm::HelmCli;
use tracing_subscriber::EnvFilter;

use crate::progress::IndicatifReporter;

const EXIT_FAILURES: u8 = 1;
const EXIT_USAGE: u8 = 2;

/// Validate Flux HelmRelease manifests by pulling and linting their charts
#[derive(Parser)]
#[command(name = "fluxcheck", version)]
struct Cli {
    /// HelmRelease manifests to validate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Repository root scanned for HelmRepository definitions
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Config file [default: <path>/fluxcheck.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Helm binary
    #[arg(long)]
    helm: Option<String>,

    /// Kustomization renderer command, split on whitespace; the directory is
    /// appended. Use `tools.kustomize` in fluxcheck.toml for paths with spaces
    #[arg(long)]
    kustomize: Option<String>,

    /// Number of files validated in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Timeout in seconds for each helm or kustomize invocation
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {e}", style::error_prefix());
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let tools = Arc::new(HelmCli::new(
        config.tools.helm.clone(),
        config.tools.kustomize.clone(),
        Duration::from_secs(config.run.timeout),
    ));
    let options = CheckOptions {
        root: cli.path.clone(),
        jobs: config.run.jobs,
        exclude: config.index.exclude.clone(),
    };

    // Spinners and log lines share stderr.
    let progress: Arc<dyn ProgressReporter> = if cli.verbose > 0 {
        Arc::new(SilentProgress)
    } else {
        Arc::new(IndicatifReporter::new())
    };

    match fluxcheck_core::run(&cli.files, &options, tools, progress).await {
        Ok(report) => {
            let mut stdout = std::io::stdout().lock();
            ExitCode::from(report.finalize(&mut stdout))
        }
        Err(e) => {
            eprintln!("{} {e}", style::error_prefix());
            ExitCode::from(EXIT_FAILURES)
        }
    }
}

/// Explicit `--config`, else `<path>/fluxcheck.toml`, else defaults.
/// Command-line flags override whatever was loaded.
fn load_config(cli: &Cli) -> Result<FluxcheckConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => fluxcheck_config::load_file(path)?,
        None => fluxcheck_config::load(&cli.path)?.unwrap_or_default(),
    };
    apply_overrides(&mut config, cli);
    fluxcheck_config::validate(&config)?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn apply_overrides(config: &mut FluxcheckConfig, cli: &Cli) {
    if let Some(helm) = &cli.helm {
        config.tools.helm = helm.clone();
    }
    if let Some(kustomize) = &cli.kustomize {
        config.tools.kustomize = split_command(kustomize);
    }
    if let Some(jobs) = cli.jobs {
        config.run.jobs = jobs;
    }
    if let Some(timeout) = cli.timeout {
        config.run.timeout = timeout;
    }
}

/// Whitespace split without quoting rules; a program path containing spaces
/// has to come from the config file's `tools.kustomize` array.
fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(String::from).collect()
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level from `warn`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
