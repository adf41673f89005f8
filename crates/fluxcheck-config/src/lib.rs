use std::path::Path;

use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "fluxcheck.toml";

pub const DEFAULT_HELM: &str = "helm";
pub const DEFAULT_JOBS: usize = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Full `fluxcheck.toml` configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FluxcheckConfig {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

/// External binaries used for pulling, linting and rendering.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// `helm = "/usr/local/bin/helm"`
    #[serde(default = "default_helm")]
    pub helm: String,

    /// Renderer command prefix; the Kustomization directory is appended.
    /// `kustomize = ["kubectl", "kustomize"]`
    #[serde(default = "default_kustomize")]
    pub kustomize: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            helm: default_helm(),
            kustomize: default_kustomize(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of files validated in parallel.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Timeout in seconds for every external tool invocation.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Directory names never descended while indexing repositories.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_helm() -> String {
    DEFAULT_HELM.to_string()
}

fn default_kustomize() -> Vec<String> {
    vec!["kustomize".to_string(), "build".to_string()]
}

fn default_jobs() -> usize {
    DEFAULT_JOBS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Load `fluxcheck.toml` from the given directory.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but cannot be read or parsed.
pub fn load(root: &Path) -> Result<Option<FluxcheckConfig>, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    load_file(&path).map(Some)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_file(path: &Path) -> Result<FluxcheckConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let config: FluxcheckConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &FluxcheckConfig) -> Result<(), ConfigError> {
    if config.tools.helm.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tools.helm must not be empty".to_string(),
        ));
    }

    if config
        .tools
        .kustomize
        .first()
        .is_none_or(|program| program.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "tools.kustomize must name a program, e.g. [\"kustomize\", \"build\"]".to_string(),
        ));
    }

    if config.run.jobs == 0 {
        return Err(ConfigError::Validation(
            "run.jobs must be at least 1".to_string(),
        ));
    }

    if config.run.timeout == 0 {
        return Err(ConfigError::Validation(
            "run.timeout must be at least 1 second".to_string(),
        ));
    }

    for name in &config.index.exclude {
        if name.contains('/') || name.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "index.exclude entry '{name}' must be a directory name, not a path"
            )));
        }
    }

    Ok(())
}
