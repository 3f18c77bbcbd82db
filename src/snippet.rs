//! Named configuration fragments with site overrides

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths;

#[derive(Debug, Error)]
pub enum SnippetError {
    #[error("failed to load config snippet {name} from {}: {source}", path.display())]
    Load {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves snippet names against `customConfigs/` then `defaultConfigs/`
#[derive(Debug, Clone)]
pub struct SnippetStore {
    root: PathBuf,
}

impl SnippetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_in(&self, configs: &str, name: &str) -> PathBuf {
        self.root
            .join(configs)
            .join("snippets")
            .join(format!("{}.{}", name, paths::SNIPPET_EXT))
    }

    /// Path that [`resolve`](Self::resolve) reads for `name`
    pub fn locate(&self, name: &str) -> PathBuf {
        let custom = self.path_in(paths::CUSTOM_CONFIGS, name);
        if custom.is_file() {
            tracing::debug!("Selected custom snippet: {} from {}", name, custom.display());
            custom
        } else {
            let default = self.path_in(paths::DEFAULT_CONFIGS, name);
            tracing::debug!("Selected default snippet: {} from {}", name, default.display());
            default
        }
    }

    /// Snippet text with a trailing newline
    pub fn resolve(&self, name: &str) -> Result<String, SnippetError> {
        let path = self.locate(name);
        let mut text = fs::read_to_string(&path).map_err(|source| SnippetError::Load {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;
        text.push('\n');
        Ok(text)
    }
}
