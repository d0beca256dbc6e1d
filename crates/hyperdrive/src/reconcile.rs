use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, error, info};

use crate::asset::Asset;
use crate::cache::{CacheDir, CacheError};
use crate::convert::{ConvertError, Converters};
use crate::download::{self, DownloadError, Downloaded, RetryPolicy};
use crate::drive::Drive;
use crate::item::RemoteItem;
use crate::media::{self, Conversion};
use crate::outcome::Outcome;

type DownloadResult<'a> = (&'a RemoteItem, Result<Downloaded, DownloadError>);

/// One download of the fan-out, boxed so the stream stays `Send` for any
/// borrow of the drive, cache and item.
fn download_one<'a>(
    drive: &'a dyn Drive,
    cache: &'a CacheDir,
    item: &'a RemoteItem,
    retry: RetryPolicy,
) -> BoxFuture<'a, DownloadResult<'a>> {
    async move { (item, download::download(drive, cache, item, retry).await) }.boxed()
}

/// Tunables for a reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub retry: RetryPolicy,
    /// Maximum downloads in flight at once. `1` keeps them strictly sequential.
    pub download_concurrency: usize,
    /// Attach the file stem to each asset as its caption.
    pub captions: bool,
    /// URL prefix the cache directory is served under, e.g. `images`.
    pub path_prefix: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            download_concurrency: 1,
            captions: false,
            path_prefix: "images".into(),
        }
    }
}

/// Result of a reconcile run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Curated, shuffled list of servable files.
    pub assets: Vec<Asset>,
    /// What happened to each file touched along the way.
    pub outcomes: Vec<Outcome>,
}

impl ReconcileReport {
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Downloaded { .. }))
            .count()
    }
}

/// Brings the cache directory in line with a remote listing and curates the
/// servable set.
///
/// Per-item download and conversion failures never abort a run: they are
/// logged, recorded as outcomes, and the item is left out of the result.
pub struct Reconciler {
    drive: Arc<dyn Drive>,
    converters: Converters,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(drive: Arc<dyn Drive>, converters: Converters, options: ReconcileOptions) -> Self {
        Self {
            drive,
            converters,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconcile `items` against `cache` with a freshly seeded shuffle.
    pub async fn reconcile(
        &self,
        items: &[RemoteItem],
        cache: &CacheDir,
    ) -> Result<ReconcileReport, CacheError> {
        let (names, outcomes) = self.collect(items, cache).await?;
        Ok(self.curate(names, outcomes, &mut rand::rng()))
    }

    /// Same as [`reconcile`](Self::reconcile) with a caller-supplied RNG.
    pub async fn reconcile_with_rng<R: Rng + ?Sized>(
        &self,
        items: &[RemoteItem],
        cache: &CacheDir,
        rng: &mut R,
    ) -> Result<ReconcileReport, CacheError> {
        let (names, outcomes) = self.collect(items, cache).await?;
        Ok(self.curate(names, outcomes, rng))
    }

    /// Fetch what is missing, convert what needs it, and return every
    /// contributed name (unfiltered, in contribution order).
    #[tracing::instrument(skip_all, fields(cache = %cache.root().display(), items = items.len()))]
    async fn collect(
        &self,
        items: &[RemoteItem],
        cache: &CacheDir,
    ) -> Result<(Vec<String>, Vec<Outcome>), CacheError> {
        let _guard = cache.lock().await;

        let before: HashSet<String> = cache.list().await?.into_iter().collect();
        let mut contributed = Vec::new();
        let mut outcomes = Vec::new();
        let mut pending = Vec::new();
        let mut scheduled = HashSet::new();

        for item in items {
            if before.contains(&item.name) {
                info!(item = %item, "cached");
                contributed.push(item.name.clone());
                outcomes.push(Outcome::Cached {
                    name: item.name.clone(),
                });
                continue;
            }

            let derived = media::derived_name(&item.name);
            if before.contains(&derived) {
                info!(item = %item, derived = %derived, "cached as converted file");
                outcomes.push(Outcome::Cached {
                    name: derived.clone(),
                });
                contributed.push(derived);
                continue;
            }

            if !media::is_plain_file_name(&item.name) {
                error!(item = %item, "refusing to download file with unsafe name");
                outcomes.push(Outcome::DownloadFailed {
                    name: item.name.clone(),
                    reason: "unsafe file name".into(),
                });
                continue;
            }

            if !scheduled.insert(item.name.as_str()) {
                debug!(item = %item, "duplicate remote name, already scheduled");
                continue;
            }
            pending.push(item);
        }

        let drive = self.drive.as_ref();
        let retry = self.options.retry;
        let downloads: Vec<_> = pending
            .into_iter()
            .map(|item| download_one(drive, cache, item, retry))
            .collect();
        let results: Vec<_> = futures::stream::iter(downloads)
            .buffer_unordered(self.options.download_concurrency.max(1))
            .collect()
            .await;

        for (item, result) in results {
            match result {
                Ok(done) => {
                    contributed.push(item.name.clone());
                    outcomes.push(Outcome::Downloaded {
                        name: item.name.clone(),
                        attempts: done.attempts,
                    });
                }
                Err(e) => {
                    error!(item = %item, error = %e, "failed all download attempts");
                    outcomes.push(Outcome::DownloadFailed {
                        name: item.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let after = cache.list().await?;
        let present: HashSet<&str> = after.iter().map(String::as_str).collect();

        for conversion in [Conversion::HeicToJpeg, Conversion::MovToGif] {
            for source in after
                .iter()
                .filter(|name| media::conversion_for(name) == Some(conversion))
            {
                let derived = media::derived_name(source);
                if present.contains(derived.as_str()) {
                    debug!(source = %source, derived = %derived, "already converted");
                    contributed.push(derived);
                    continue;
                }

                info!(source = %source, derived = %derived, "converting");
                match self.convert(cache, conversion, source, &derived).await {
                    Ok(()) => {
                        outcomes.push(Outcome::Converted {
                            source: source.clone(),
                            derived: derived.clone(),
                        });
                        contributed.push(derived);
                    }
                    Err(e) => {
                        error!(source = %source, error = %e, "could not convert");
                        outcomes.push(Outcome::ConversionFailed {
                            source: source.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok((contributed, outcomes))
    }

    /// Convert `source` into `derived`, going through a hidden partial file
    /// so a half-written artifact never appears under the derived name.
    async fn convert(
        &self,
        cache: &CacheDir,
        conversion: Conversion,
        source: &str,
        derived: &str,
    ) -> Result<(), ConvertError> {
        let input = cache.path_of(source);
        let partial = cache.partial_path_of(derived);

        let result = async {
            match conversion {
                Conversion::HeicToJpeg => {
                    let heic = tokio::fs::read(&input).await?;
                    let jpeg = self.converters.heic.to_jpeg(heic).await?;
                    if jpeg.is_empty() {
                        return Err(ConvertError::EmptyOutput);
                    }
                    tokio::fs::write(&partial, jpeg).await?;
                }
                Conversion::MovToGif => {
                    self.converters.mov.to_gif(&input, &partial).await?;
                    if tokio::fs::metadata(&partial).await?.len() == 0 {
                        return Err(ConvertError::EmptyOutput);
                    }
                }
            }
            tokio::fs::rename(&partial, cache.path_of(derived)).await?;
            Ok::<(), ConvertError>(())
        }
        .await;

        if result.is_err() {
            download::discard_partial(&partial).await;
        }
        result
    }

    /// Keep servable names once each, shuffle, and map to assets.
    fn curate<R: Rng + ?Sized>(
        &self,
        names: Vec<String>,
        outcomes: Vec<Outcome>,
        rng: &mut R,
    ) -> ReconcileReport {
        let mut seen = HashSet::new();
        let mut servable: Vec<String> = names
            .into_iter()
            .filter(|name| media::is_supported_name(name))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        servable.shuffle(rng);

        let assets = servable
            .iter()
            .map(|name| Asset::new(&self.options.path_prefix, name, self.options.captions))
            .collect();

        ReconcileReport { assets, outcomes }
    }
}
