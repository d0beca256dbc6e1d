use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheDir, CacheError};
use crate::convert::Converters;
use crate::drive::{Drive, DriveError};
use crate::item::FolderId;
use crate::prune::{self, PruneReport};
use crate::reconcile::{ReconcileOptions, ReconcileReport, Reconciler};

/// Errors that abort a whole refresh or clean.
///
/// Per-file problems never end up here; they are recorded in the reports.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("could not list remote folder: {0}")]
    Listing(#[from] DriveError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// One remote folder mirrored into one cache directory.
///
/// Every call re-lists the remote folder; nothing about the listing is
/// remembered between calls.
pub struct Gallery {
    drive: Arc<dyn Drive>,
    folder: FolderId,
    cache: CacheDir,
    reconciler: Reconciler,
}

impl Gallery {
    pub fn new(
        drive: Arc<dyn Drive>,
        folder: FolderId,
        cache: CacheDir,
        converters: Converters,
        options: ReconcileOptions,
    ) -> Self {
        let reconciler = Reconciler::new(Arc::clone(&drive), converters, options);
        Self {
            drive,
            folder,
            cache,
            reconciler,
        }
    }

    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    pub fn folder(&self) -> &FolderId {
        &self.folder
    }

    /// List the remote folder and reconcile the cache against it.
    pub async fn refresh(&self) -> Result<ReconcileReport, SyncError> {
        let items = self.drive.list(&self.folder).await?;
        info!(drive = self.drive.label(), folder = %self.folder, items = items.len(), "listed remote folder");

        let report = self.reconciler.reconcile(&items, &self.cache).await?;
        info!(
            assets = report.assets.len(),
            downloaded = report.downloaded(),
            failures = report.failures().count(),
            "refresh complete"
        );
        Ok(report)
    }

    /// List the remote folder and prune the cache against it.
    pub async fn clean(&self) -> Result<PruneReport, SyncError> {
        let items = self.drive.list(&self.folder).await?;
        info!(drive = self.drive.label(), folder = %self.folder, items = items.len(), "listed remote folder");

        let report = prune::prune(&items, &self.cache).await?;
        info!(
            deleted = report.deleted.len(),
            kept = report.kept,
            failures = report.failures.len(),
            "clean complete"
        );
        Ok(report)
    }
}
