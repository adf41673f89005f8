use std::fmt;
use std::path::{Path, PathBuf};

use fluxcheck_helm::{PullSpec, Renderer};
use serde_yaml_ng::Value;

use crate::CheckError;
use crate::index::RepositoryIndex;
use crate::manifest::{self, ReleaseName};

/// Files that mark a directory as a Kustomization root.
const KUSTOMIZATION_FILES: &[&str] = &["kustomization.yaml", "kustomization.yml", "Kustomization"];

const CHART_REF_SKIP: &str = "chart is referenced through spec.chartRef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    HelmRepository,
    OciRepository,
    Unknown(String),
}

impl SourceKind {
    fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("HelmRepository") => Self::HelmRepository,
            Some("OCIRepository") => Self::OciRepository,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown(String::new()),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HelmRepository => write!(f, "HelmRepository"),
            Self::OciRepository => write!(f, "OCIRepository"),
            Self::Unknown(kind) if kind.is_empty() => write!(f, "<unspecified>"),
            Self::Unknown(kind) => write!(f, "{kind}"),
        }
    }
}

/// Chart coordinates declared by a HelmRelease's `spec.chart.spec`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartReference {
    pub chart: String,
    /// Empty only for sources other than `HelmRepository`, where Flux
    /// ignores it.
    pub version: String,
    pub source_kind: SourceKind,
    pub source_name: String,
    pub values: Option<Value>,
}

impl ChartReference {
    /// Read `spec.chart.spec` from a HelmRelease document.
    ///
    /// `Ok(None)` means the document has no chart spec at all; an incomplete
    /// chart spec is a parse error.
    pub fn from_release(doc: &Value) -> Result<Option<Self>, CheckError> {
        let Some(spec) = manifest::lookup(doc, &["spec", "chart", "spec"]) else {
            return Ok(None);
        };
        let release = manifest::lookup_str(doc, &["metadata", "name"]).unwrap_or("<unnamed>");
        let missing = |field: &str| {
            CheckError::Parse(format!(
                "HelmRelease {release} is missing spec.chart.spec.{field}"
            ))
        };

        let chart = manifest::lookup_str(spec, &["chart"]).ok_or_else(|| missing("chart"))?;
        let source_name = manifest::lookup_str(spec, &["sourceRef", "name"])
            .ok_or_else(|| missing("sourceRef.name"))?;
        let source_kind = SourceKind::parse(manifest::lookup_str(spec, &["sourceRef", "kind"]));
        let version = match manifest::lookup_scalar(spec, &["version"]) {
            Some(version) => version,
            None if source_kind != SourceKind::HelmRepository => String::new(),
            None => return Err(missing("version")),
        };

        if !version.is_empty() && !is_semver_like(&version) {
            tracing::warn!(release, %version, "chart version is neither a semver version nor a range");
        }
        if manifest::lookup(doc, &["spec", "valuesFrom"]).is_some() {
            tracing::warn!(release, "spec.valuesFrom is not resolved; linting with inline values only");
        }

        let values = manifest::lookup(doc, &["spec", "values"])
            .filter(|v| !v.is_null())
            .cloned();

        Ok(Some(Self {
            chart: chart.to_string(),
            version,
            source_kind,
            source_name: source_name.to_string(),
            values,
        }))
    }
}

fn is_semver_like(version: &str) -> bool {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(trimmed).is_ok() || semver::VersionReq::parse(version).is_ok()
}

/// A chart reference paired with the repository URL it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChart {
    pub reference: ChartReference,
    pub url: String,
}

impl ResolvedChart {
    pub fn pull_spec(&self) -> PullSpec<'_> {
        PullSpec {
            repository: &self.url,
            chart: &self.reference.chart,
            version: &self.reference.version,
        }
    }

    pub fn is_oci(&self) -> bool {
        fluxcheck_helm::oci::is_oci(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Chart(ResolvedChart),
    /// Valid release that is intentionally not validated.
    Skip(String),
}

/// Resolve the chart behind `release`, read from `file`.
///
/// Without a direct `spec.chart.spec`, Kustomization directories above
/// `file` are rendered nearest first, stopping at `search_root`.
pub async fn resolve<R>(
    file: &Path,
    name: &ReleaseName,
    release: &Value,
    index: &RepositoryIndex,
    renderer: &R,
    search_root: &Path,
) -> Result<Resolution, CheckError>
where
    R: Renderer + ?Sized,
{
    let reference = match ChartReference::from_release(release)? {
        Some(reference) => reference,
        None if has_chart_ref(release) => {
            return Ok(Resolution::Skip(CHART_REF_SKIP.to_string()));
        }
        None => {
            let rendered = find_rendered_release(file, name, renderer, search_root).await?;
            let nested = match &rendered {
                Some((_, doc)) => ChartReference::from_release(doc)?,
                None => None,
            };
            match nested {
                Some(reference) => reference,
                None => {
                    if rendered.as_ref().is_some_and(|(_, doc)| has_chart_ref(doc)) {
                        return Ok(Resolution::Skip(CHART_REF_SKIP.to_string()));
                    }
                    return Err(CheckError::Resolution(match rendered {
                        Some((dir, _)) => format!(
                            "HelmRelease {name} has no spec.chart.spec, and the HelmRelease rendered from {} has none either",
                            dir.display()
                        ),
                        None => format!(
                            "HelmRelease {name} has neither spec.chart.spec nor spec.chartRef, and no enclosing Kustomization renders one"
                        ),
                    }));
                }
            }
        }
    };

    if reference.source_kind != SourceKind::HelmRepository {
        return Ok(Resolution::Skip(format!(
            "chart source {} '{}' is not a HelmRepository",
            reference.source_kind, reference.source_name
        )));
    }

    let url = index.get(&reference.source_name).ok_or_else(|| {
        CheckError::Resolution(format!(
            "HelmRelease {name} references HelmRepository '{}', which is not declared under {}",
            reference.source_name,
            search_root.display()
        ))
    })?;

    Ok(Resolution::Chart(ResolvedChart {
        url: url.to_string(),
        reference,
    }))
}

/// Render each Kustomization above `file` until one yields a HelmRelease.
///
/// Prefers the rendered release carrying the same `metadata.name`.
async fn find_rendered_release<R>(
    file: &Path,
    name: &ReleaseName,
    renderer: &R,
    search_root: &Path,
) -> Result<Option<(PathBuf, Value)>, CheckError>
where
    R: Renderer + ?Sized,
{
    for dir in ancestor_dirs(file, search_root) {
        if !is_kustomization_dir(&dir) {
            continue;
        }
        tracing::debug!(dir = %dir.display(), release = %name, "rendering kustomization");

        let stream = renderer.render(&dir).await.map_err(|e| {
            CheckError::Resolution(format!(
                "rendering kustomization {} failed: {}",
                dir.display(),
                e.detail()
            ))
        })?;
        let docs = manifest::parse_documents(&stream).map_err(|e| {
            CheckError::Resolution(format!(
                "kustomization {} rendered invalid YAML: {e}",
                dir.display()
            ))
        })?;

        let mut releases = manifest::helm_releases(&docs).peekable();
        let Some(first) = releases.peek().copied() else {
            continue;
        };
        let chosen = releases
            .find(|doc| manifest::lookup_str(doc, &["metadata", "name"]) == Some(name.name.as_str()))
            .unwrap_or(first);
        return Ok(Some((dir, chosen.clone())));
    }
    Ok(None)
}

/// Directories enclosing `file`, nearest first.
///
/// Ends at `search_root` when `file` lies beneath it, otherwise at the
/// filesystem root.
pub fn ancestor_dirs(file: &Path, search_root: &Path) -> Vec<PathBuf> {
    let Some(parent) = file.parent() else {
        return Vec::new();
    };
    let bounded = parent.starts_with(search_root);

    let mut dirs = Vec::new();
    for dir in parent.ancestors() {
        if dir.as_os_str().is_empty() {
            break;
        }
        dirs.push(dir.to_path_buf());
        if bounded && dir == search_root {
            break;
        }
    }
    dirs
}

fn has_chart_ref(doc: &Value) -> bool {
    manifest::lookup(doc, &["spec", "chartRef"]).is_some()
}

fn is_kustomization_dir(dir: &Path) -> bool {
    KUSTOMIZATION_FILES
        .iter()
        .any(|file| dir.join(file).is_file())
}
