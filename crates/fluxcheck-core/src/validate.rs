use std::path::{Path, PathBuf};

use fluxcheck_helm::ChartTools;
use serde_yaml_ng::{Mapping, Value};

use crate::CheckError;
use crate::report::{Stage, ValidationOutcome};
use crate::resolve::ResolvedChart;

pub const VALUES_FILENAME: &str = "values.yaml";

/// Pull `chart` and lint it with the release's values.
///
/// Runs in a private temp directory removed on every return path. Returns one
/// outcome per stage attempted; lint is skipped when pull fails.
pub async fn validate_chart<T>(
    input: &Path,
    chart: &ResolvedChart,
    tools: &T,
) -> Result<Vec<ValidationOutcome>, CheckError>
where
    T: ChartTools + ?Sized,
{
    let workdir = tempfile::Builder::new()
        .prefix("fluxcheck-")
        .tempdir()
        .map_err(|e| CheckError::Io(format!("create temp dir: {e}")))?;

    let mut outcomes = Vec::new();
    let spec = chart.pull_spec();

    if let Err(e) = tools.pull(&spec, workdir.path()).await {
        outcomes.push(ValidationOutcome::failed(input, Stage::Pull, e.detail()));
        return Ok(outcomes);
    }
    outcomes.push(ValidationOutcome::passed(input, Stage::Pull));

    let values = write_values(workdir.path(), chart.reference.values.as_ref())?;
    let archives = find_archives(workdir.path())?;
    if archives.is_empty() {
        outcomes.push(ValidationOutcome::failed(
            input,
            Stage::Lint,
            format!(
                "helm pull of {} {} produced no chart archive",
                chart.reference.chart, chart.reference.version
            ),
        ));
        return Ok(outcomes);
    }

    match tools.lint(&values, &archives, workdir.path()).await {
        Ok(()) => outcomes.push(ValidationOutcome::passed(input, Stage::Lint)),
        Err(e) => outcomes.push(ValidationOutcome::failed(input, Stage::Lint, e.detail())),
    }
    Ok(outcomes)
}

/// Write `values` (or an empty mapping) to `values.yaml` in `dir`.
fn write_values(dir: &Path, values: Option<&Value>) -> Result<PathBuf, CheckError> {
    let empty = Value::Mapping(Mapping::new());
    let yaml = serde_yaml_ng::to_string(values.unwrap_or(&empty))
        .map_err(|e| CheckError::Io(format!("serialize values: {e}")))?;
    let path = dir.join(VALUES_FILENAME);
    std::fs::write(&path, yaml)
        .map_err(|e| CheckError::Io(format!("write {}: {e}", path.display())))?;
    Ok(path)
}

/// `*.tgz` files directly inside `dir`, sorted.
fn find_archives(dir: &Path) -> Result<Vec<PathBuf>, CheckError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CheckError::Io(format!("read dir {}: {e}", dir.display())))?;
    let mut archives: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "tgz"))
        .collect();
    archives.sort();
    Ok(archives)
}
