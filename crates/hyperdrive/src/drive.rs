use std::path::Path;
use std::sync::Arc;

use crate::item::{FolderId, RemoteId, RemoteItem};

/// Errors that can occur when talking to the remote drive.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("file not found: {0}")]
    NotFound(RemoteId),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A remote folder of gallery files.
///
/// Implementations know how to list the children of a folder and stream a
/// single file's bytes to disk (e.g., Google Drive).
#[async_trait::async_trait]
pub trait Drive: Send + Sync {
    /// Human-readable label identifying this drive.
    fn label(&self) -> &str;

    /// List the files whose parent is `folder`.
    async fn list(&self, folder: &FolderId) -> Result<Vec<RemoteItem>, DriveError>;

    /// Write the contents of `item` to `dest`, creating or truncating it.
    /// Returns the number of bytes written.
    async fn fetch(&self, item: &RemoteItem, dest: &Path) -> Result<u64, DriveError>;
}

#[async_trait::async_trait]
impl<T: Drive + ?Sized> Drive for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn list(&self, folder: &FolderId) -> Result<Vec<RemoteItem>, DriveError> {
        (**self).list(folder).await
    }

    async fn fetch(&self, item: &RemoteItem, dest: &Path) -> Result<u64, DriveError> {
        (**self).fetch(item, dest).await
    }
}
