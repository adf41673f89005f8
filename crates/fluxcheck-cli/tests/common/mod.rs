#![allow(dead_code)]
//! Shared helpers for CLI tests: a temp Flux repository plus fake `helm` and
//! `kustomize` scripts that record their arguments.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Pull writes `<chart>-1.0.0.tgz` unless the target contains `missing`.
/// Lint fails when the values file contains `broken: true`.
const FAKE_HELM: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_HELM_LOG"
cmd="$1"
shift
case "$cmd" in
  pull)
    dest=""
    target=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --destination) dest="$2"; shift 2 ;;
        --) target="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    case "$target" in
      *missing*)
        echo "Error: failed to pull $target: not found" >&2
        exit 1
        ;;
    esac
    name=$(basename "$target")
    : > "$dest/$name-1.0.0.tgz"
    ;;
  lint)
    if grep -q "broken: true" "$2"; then
      echo "[ERROR] templates/: values are broken"
      echo "Error: 1 chart(s) linted, 1 chart(s) failed" >&2
      exit 1
    fi
    echo "1 chart(s) linted, 0 chart(s) failed"
    ;;
esac
exit 0
"#;

/// Prints `rendered.txt` from the directory it is asked to build.
const FAKE_KUSTOMIZE: &str = r#"#!/bin/sh
cat "$1/rendered.txt"
"#;

pub const BITNAMI: &str = r#"apiVersion: source.toolkit.fluxcd.io/v1
kind: HelmRepository
metadata:
  name: bitnami
  namespace: flux-system
spec:
  url: https://charts.bitnami.com/bitnami
"#;

pub const MISSING_OCI: &str = r#"apiVersion: source.toolkit.fluxcd.io/v1
kind: HelmRepository
metadata:
  name: private
  namespace: flux-system
spec:
  type: oci
  url: oci://registry.example.com/missing
"#;

pub fn release(name: &str, chart: &str, repository: &str, values: &str) -> String {
    format!(
        r#"apiVersion: helm.toolkit.fluxcd.io/v2
kind: HelmRelease
metadata:
  name: {name}
  namespace: apps
spec:
  interval: 10m
  chart:
    spec:
      chart: {chart}
      version: "1.0.0"
      sourceRef:
        kind: HelmRepository
        name: {repository}
  values:
{values}
"#
    )
}

pub struct Fixture {
    pub dir: TempDir,
    bin: TempDir,
}

impl Fixture {
    /// Repository with `repos/bitnami.yaml` and `repos/private.yaml`.
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
            bin: tempfile::tempdir().unwrap(),
        };
        fixture.write("repos/bitnami.yaml", BITNAMI);
        fixture.write("repos/private.yaml", MISSING_OCI);
        write_script(&fixture.helm(), FAKE_HELM);
        write_script(&fixture.kustomize(), FAKE_KUSTOMIZE);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn helm(&self) -> PathBuf {
        self.bin.path().join("helm")
    }

    pub fn kustomize(&self) -> PathBuf {
        self.bin.path().join("kustomize")
    }

    pub fn helm_log(&self) -> PathBuf {
        self.bin.path().join("helm.log")
    }

    /// Every recorded helm invocation, one line each.
    pub fn helm_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.helm_log())
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    /// `fluxcheck` run from the fixture root with both fake tools wired in.
    pub fn fluxcheck(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("fluxcheck");
        cmd.current_dir(self.root())
            .env("FAKE_HELM_LOG", self.helm_log())
            .env_remove("RUST_LOG")
            .arg("--helm")
            .arg(self.helm())
            .arg("--kustomize")
            .arg(self.kustomize());
        cmd
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
