use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::{PullSpec, oci};

/// Arguments for `helm pull`.
///
/// OCI:        `pull --version V --destination D -- oci://host/path/chart`
/// Repository: `pull --repo URL --version V --destination D -- chart`
pub(crate) fn pull_args(spec: &PullSpec<'_>, destination: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["pull".into()];
    if !spec.is_oci() {
        args.push("--repo".into());
        args.push(spec.repository.into());
    }
    args.push("--version".into());
    args.push(spec.version.into());
    args.push("--destination".into());
    args.push(destination.into());
    args.push("--".into());
    if spec.is_oci() {
        args.push(oci::chart_reference(spec.repository, spec.chart).into());
    } else {
        args.push(spec.chart.into());
    }
    args
}

/// Arguments for `helm lint -f values.yaml -- archive.tgz...`.
pub(crate) fn lint_args(values: &Path, archives: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["lint".into(), "-f".into(), values.into(), "--".into()];
    args.extend(archives.iter().map(OsString::from));
    args
}
