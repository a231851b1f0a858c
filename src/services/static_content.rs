use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::types::{Locale, Namespace};

#[derive(Debug, Error)]
pub enum StaticContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The shipped `<root>/<locale>/<namespace>.json` baseline copy.
#[derive(Debug, Clone)]
pub struct StaticContent {
    root: PathBuf,
}

impl StaticContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, locale: Locale, namespace: Namespace) -> PathBuf {
        self.root
            .join(locale.as_str())
            .join(format!("{}.json", namespace.as_str()))
    }

    pub async fn read(&self, locale: Locale, namespace: Namespace) -> Result<Value, StaticContentError> {
        read_json(&self.path(locale, namespace)).await
    }
}

pub async fn read_json(path: &Path) -> Result<Value, StaticContentError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StaticContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StaticContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_by_locale_and_namespace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("en")).unwrap();
        std::fs::write(dir.path().join("en/faq.json"), r#"{"title":"FAQ"}"#).unwrap();
        std::fs::write(dir.path().join("en/home.json"), "{not json").unwrap();

        let content = StaticContent::new(dir.path());
        assert_eq!(content.read(Locale::En, Namespace::Faq).await.unwrap()["title"], "FAQ");
        assert!(matches!(
            content.read(Locale::En, Namespace::Home).await,
            Err(StaticContentError::Parse { .. })
        ));
        assert!(matches!(
            content.read(Locale::Es, Namespace::Faq).await,
            Err(StaticContentError::Io { .. })
        ));
    }
}
