//! Privileged filesystem access for module enumeration

use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Filesystem view with enough privilege to read the modules root
#[async_trait]
pub trait ModuleFs: Send + Sync {
    /// Names of the entries in a directory
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    async fn is_dir(&self, path: &Path) -> bool;

    async fn exists(&self, path: &Path) -> bool;

    async fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// Direct filesystem access from the current process
#[derive(Debug, Clone, Default)]
pub struct LocalModuleFs;

#[async_trait]
impl ModuleFs for LocalModuleFs {
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| file_error(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| file_error(path, e))? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| file_error(path, e))
    }
}

fn file_error(path: &Path, err: std::io::Error) -> Error {
    Error::FileAccess(format!("{}: {}", path.display(), err))
}
