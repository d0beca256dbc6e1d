use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use tracing::{error, info};

use crate::cache::{CacheDir, CacheError};
use crate::item::RemoteItem;
use crate::media;

/// Why a cache file was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    /// The extension is not servable.
    Unsupported,
    /// Neither the file nor its conversion origin is listed remotely.
    Orphaned,
}

/// Summary of a prune pass.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub deleted: Vec<(String, PruneReason)>,
    pub kept: usize,
    /// Files that should have been deleted but could not be, with the error.
    pub failures: Vec<(String, String)>,
}

impl PruneReport {
    pub fn deleted_names(&self) -> impl Iterator<Item = &str> {
        self.deleted.iter().map(|(name, _)| name.as_str())
    }
}

/// Decide whether `name` should be removed given the remote listing.
///
/// `listed` holds every remote name; `derived_targets` holds the converted
/// names of listed `.heic`/`.mov` sources.
fn verdict(
    name: &str,
    listed: &HashSet<&str>,
    derived_targets: &HashSet<String>,
) -> Option<PruneReason> {
    if !media::is_supported_name(name) {
        return Some(PruneReason::Unsupported);
    }
    if listed.contains(name) || derived_targets.contains(name) {
        return None;
    }
    Some(PruneReason::Orphaned)
}

/// Delete cache files that are unsupported or no longer backed by the remote
/// listing.
///
/// A file survives when a remote item has its exact name, or when it is the
/// converted form of a `.heic`/`.mov` item that is still listed. Deletions are
/// independent: a failure is logged and recorded, and the pass continues.
#[tracing::instrument(skip_all, fields(cache = %cache.root().display(), items = items.len()))]
pub async fn prune(items: &[RemoteItem], cache: &CacheDir) -> Result<PruneReport, CacheError> {
    prune_with(items, cache, |path| tokio::fs::remove_file(path)).await
}

async fn prune_with<F, Fut>(
    items: &[RemoteItem],
    cache: &CacheDir,
    mut remove: F,
) -> Result<PruneReport, CacheError>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let _guard = cache.lock().await;

    let listed: HashSet<&str> = items.iter().map(|i| i.name.as_str()).collect();
    let derived_targets: HashSet<String> = items
        .iter()
        .filter(|i| media::conversion_for(&i.name).is_some())
        .map(|i| media::derived_name(&i.name))
        .collect();

    let mut report = PruneReport::default();

    for name in cache.list().await? {
        let Some(reason) = verdict(&name, &listed, &derived_targets) else {
            report.kept += 1;
            continue;
        };

        match remove(cache.path_of(&name)).await {
            Ok(()) => {
                info!(file = %name, ?reason, "removed");
                report.deleted.push((name, reason));
            }
            Err(e) => {
                error!(file = %name, error = %e, "could not remove");
                report.failures.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}
