/// Whether a repository URL addresses an OCI registry.
pub fn is_oci(url: &str) -> bool {
    url.starts_with("oci://")
}

/// Pull target for a chart stored in an OCI registry.
///
/// `oci://ghcr.io/org/charts` + `podinfo` → `oci://ghcr.io/org/charts/podinfo`
pub fn chart_reference(url: &str, chart: &str) -> String {
    format!("{}/{chart}", url.trim_end_matches('/'))
}
