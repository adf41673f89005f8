use std::collections::BTreeMap;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::CheckError;
use crate::manifest::{self, HELM_REPOSITORY};

/// `HelmRepository` name → URL for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    repositories: BTreeMap<String, String>,
}

impl RepositoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a repository, returning the URL it replaced.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.repositories.insert(name.into(), url.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.repositories.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.repositories
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Directory names that are never descended.
    pub exclude: Vec<String>,
}

/// Scan every `.yaml`/`.yml` file under `root` for `HelmRepository` documents.
///
/// Files that cannot be read or parsed are skipped. When a name is declared
/// more than once, the last file in sorted traversal order wins.
pub fn build_index(root: &Path, options: &IndexOptions) -> Result<RepositoryIndex, CheckError> {
    if !root.is_dir() {
        return Err(CheckError::Index(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut index = RepositoryIndex::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry, &options.exclude));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_yaml(entry.path()) {
            continue;
        }
        index_file(entry.path(), &mut index);
    }

    Ok(index)
}

fn index_file(path: &Path, index: &mut RepositoryIndex) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), "skipping unreadable file: {e}");
            return;
        }
    };
    let docs = match manifest::parse_documents(&content) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::debug!(path = %path.display(), "skipping unparsable file: {e}");
            return;
        }
    };

    for doc in docs.iter().filter(|doc| manifest::is_kind(doc, HELM_REPOSITORY)) {
        let (Some(name), Some(url)) = (
            manifest::lookup_str(doc, &["metadata", "name"]),
            manifest::lookup_str(doc, &["spec", "url"]),
        ) else {
            tracing::debug!(path = %path.display(), "HelmRepository without metadata.name or spec.url");
            continue;
        };
        if let Some(previous) = index.insert(name, url)
            && previous != url
        {
            tracing::warn!(
                repository = name,
                %previous,
                url,
                path = %path.display(),
                "HelmRepository declared more than once; using the later definition"
            );
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

fn is_skipped_dir(entry: &DirEntry, exclude: &[String]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || exclude.iter().any(|ex| *ex == name)
}
