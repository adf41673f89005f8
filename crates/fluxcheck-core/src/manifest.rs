use std::fmt;

use serde::Deserialize;
use serde_yaml_ng::Value;

use crate::CheckError;

pub const HELM_RELEASE: &str = "HelmRelease";
pub const HELM_REPOSITORY: &str = "HelmRepository";

/// Parse a (possibly multi-document) YAML stream. Empty documents are dropped.
pub fn parse_documents(content: &str) -> Result<Vec<Value>, serde_yaml_ng::Error> {
    let mut docs = Vec::new();
    for doc in serde_yaml_ng::Deserializer::from_str(content) {
        let value = Value::deserialize(doc)?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

pub fn kind(doc: &Value) -> Option<&str> {
    doc.get("kind").and_then(Value::as_str)
}

pub fn is_kind(doc: &Value, expected: &str) -> bool {
    kind(doc) == Some(expected)
}

/// Walk nested mapping keys: `lookup(doc, &["spec", "chart", "spec"])`.
pub fn lookup<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, key| node.get(*key))
}

/// Non-empty string at `path`.
pub fn lookup_str<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(doc, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Scalar at `path` rendered as text. Chart versions are sometimes written
/// unquoted (`version: 1.0`) and arrive as numbers.
pub fn lookup_scalar(doc: &Value, path: &[&str]) -> Option<String> {
    let text = match lookup(doc, path)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}

/// All `HelmRelease` documents in a stream, in order.
pub fn helm_releases(docs: &[Value]) -> impl Iterator<Item = &Value> {
    docs.iter().filter(|doc| is_kind(doc, HELM_RELEASE))
}

/// `namespace/name` of a HelmRelease.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseName {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Locate the first `HelmRelease` in `docs` and check its identity fields.
///
/// Returns `Ok(None)` when the stream holds no HelmRelease at all.
pub fn first_helm_release(docs: &[Value]) -> Result<Option<(ReleaseName, &Value)>, CheckError> {
    let Some((position, doc)) = docs
        .iter()
        .enumerate()
        .find(|(_, doc)| is_kind(doc, HELM_RELEASE))
    else {
        return Ok(None);
    };

    let name = lookup_str(doc, &["metadata", "name"]);
    let namespace = lookup_str(doc, &["metadata", "namespace"]);
    match (name, namespace) {
        (Some(name), Some(namespace)) => Ok(Some((
            ReleaseName {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            doc,
        ))),
        (name, namespace) => {
            let missing: Vec<&str> = [
                name.is_none().then_some("metadata.name"),
                namespace.is_none().then_some("metadata.namespace"),
            ]
            .into_iter()
            .flatten()
            .collect();
            Err(CheckError::Parse(format!(
                "HelmRelease {} (document {}) is missing {}",
                name.unwrap_or("<unnamed>"),
                position + 1,
                missing.join(" and ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_doc_stream_skips_empty_documents() {
        let docs = parse_documents("---\nkind: A\n---\n---\nkind: B\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(kind(&docs[0]), Some("A"));
        assert_eq!(kind(&docs[1]), Some("B"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(parse_documents("kind: [unclosed").is_err());
    }

    #[test]
    fn lookup_nested_paths() {
        let docs = parse_documents("spec:\n  chart:\n    spec:\n      chart: redis\n").unwrap();
        assert_eq!(
            lookup_str(&docs[0], &["spec", "chart", "spec", "chart"]),
            Some("redis")
        );
        assert!(lookup(&docs[0], &["spec", "chartRef"]).is_none());
    }

    #[test]
    fn blank_strings_are_absent() {
        let docs = parse_documents("metadata:\n  name: '  '\n").unwrap();
        assert!(lookup_str(&docs[0], &["metadata", "name"]).is_none());
    }

    #[test]
    fn numeric_version_becomes_text() {
        let docs = parse_documents("version: 1.5\nother: 17\n").unwrap();
        assert_eq!(lookup_scalar(&docs[0], &["version"]).as_deref(), Some("1.5"));
        assert_eq!(lookup_scalar(&docs[0], &["other"]).as_deref(), Some("17"));
    }

    #[test]
    fn first_release_with_metadata() {
        let docs = parse_documents(
            r#"
kind: ConfigMap
metadata: {name: cm}
---
kind: HelmRelease
metadata: {name: app, namespace: default}
---
kind: HelmRelease
metadata: {name: other, namespace: default}
"#,
        )
        .unwrap();
        let (name, doc) = first_helm_release(&docs).unwrap().unwrap();
        assert_eq!(name.to_string(), "default/app");
        assert_eq!(lookup_str(doc, &["metadata", "name"]), Some("app"));
    }

    #[test]
    fn no_release_is_none() {
        let docs = parse_documents("kind: HelmRepository\nmetadata: {name: r}\n").unwrap();
        assert!(first_helm_release(&docs).unwrap().is_none());
    }

    #[test]
    fn missing_namespace_is_parse_error() {
        let docs = parse_documents("kind: HelmRelease\nmetadata: {name: app}\n").unwrap();
        let err = first_helm_release(&docs).unwrap_err();
        assert!(matches!(err, CheckError::Parse(_)));
        assert!(err.to_string().contains("app"));
        assert!(err.to_string().contains("metadata.namespace"));
    }

    #[test]
    fn missing_both_names_lists_both() {
        let docs = parse_documents("kind: HelmRelease\nspec: {}\n").unwrap();
        let err = first_helm_release(&docs).unwrap_err();
        assert!(err.to_string().contains("metadata.name and metadata.namespace"));
    }
}
