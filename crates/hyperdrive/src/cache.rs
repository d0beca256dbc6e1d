use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Errors that can occur when reading the cache directory itself.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("could not read cache directory {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle on the local directory that mirrors the remote folder.
///
/// The directory listing is the cache index: there is no manifest. Clones
/// share one guard, and reconcile and prune each hold it for their whole
/// run, so overlapping requests against the same handle are serialised.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
    guard: Arc<Mutex<()>>,
}

/// Proof that the holder has exclusive use of a [`CacheDir`].
pub struct CacheGuard {
    _guard: OwnedMutexGuard<()>,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a cache entry.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Hidden sibling a download streams into before it is renamed onto `name`.
    pub fn partial_path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}.part"))
    }

    /// Wait for exclusive use of the directory.
    pub async fn lock(&self) -> CacheGuard {
        CacheGuard {
            _guard: Arc::clone(&self.guard).lock_owned().await,
        }
    }

    /// Names of the regular files currently in the directory, sorted.
    ///
    /// Subdirectories are ignored, as are names that are not valid UTF-8.
    pub async fn list(&self) -> Result<Vec<String>, CacheError> {
        let read_err = |source| CacheError::Read {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(read_err)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable cache entry");
                    continue;
                }
            };
            if !file_type.is_file() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::warn!(name = ?raw, "skipping cache entry with non UTF-8 name");
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
