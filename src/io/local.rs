use super::{ObjectStore, StorageError};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

/// Object store backed by a local directory
///
/// Keys are relative paths below the root directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("storage root {} is not accessible", root.display()))?;
        if !root.is_dir() {
            bail!("storage root {} is not a directory", root.display());
        }
        Ok(Self { root })
    }

    /// Map a key to a path below the root, refusing keys that could escape it
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let mut saw_normal = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => saw_normal = true,
                Component::CurDir => {}
                _ => return None,
            }
        }
        saw_normal.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(StorageError::Upstream(
                anyhow::Error::new(e).context(format!("failed to read {}", path.display())),
            )),
        }
    }
}
