use tracing::{info, warn};

use crate::cache::CacheDir;
use crate::drive::{Drive, DriveError};
use crate::item::RemoteItem;

/// Number of tries a single remote file gets before it is skipped.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How many times a download is attempted. Attempts are immediate, with no
/// backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// A policy allowing `max_attempts` tries (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error("downloaded file was empty")]
    Empty,

    #[error("could not move download into place: {0}")]
    Io(#[from] std::io::Error),
}

/// Every attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("gave up on {name} after {attempts} attempt(s): {last}")]
pub struct DownloadError {
    pub name: String,
    pub attempts: u32,
    #[source]
    pub last: AttemptError,
}

/// A successful download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downloaded {
    pub attempts: u32,
    pub bytes: u64,
}

/// Fetch `item` into the cache under its own name.
///
/// Each attempt streams into a hidden partial file and is renamed onto the
/// final name only when it produced at least one byte, so a failed item
/// never leaves an empty or truncated file under its real name.
pub async fn download(
    drive: &dyn Drive,
    cache: &CacheDir,
    item: &RemoteItem,
    policy: RetryPolicy,
) -> Result<Downloaded, DownloadError> {
    let partial = cache.partial_path_of(&item.name);
    let dest = cache.path_of(&item.name);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = async {
            drive.fetch(item, &partial).await?;
            let bytes = tokio::fs::metadata(&partial).await?.len();
            if bytes == 0 {
                return Err(AttemptError::Empty);
            }
            tokio::fs::rename(&partial, &dest).await?;
            Ok::<u64, AttemptError>(bytes)
        }
        .await;

        match result {
            Ok(bytes) => {
                info!(item = %item, attempt, bytes, "downloaded");
                return Ok(Downloaded {
                    attempts: attempt,
                    bytes,
                });
            }
            Err(e) if attempt < policy.max_attempts() => {
                warn!(item = %item, attempt, error = %e, "download attempt failed, retrying");
            }
            Err(e) => {
                discard_partial(&partial).await;
                return Err(DownloadError {
                    name: item.name.clone(),
                    attempts: attempt,
                    last: e,
                });
            }
        }
    }
}

pub(crate) async fn discard_partial(path: &std::path::Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryDrive;

    use super::*;

    #[tokio::test]
    async fn successful_download_lands_under_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let drive = InMemoryDrive::new("test");
        let item = drive.add("1", "a.png", b"png-bytes");

        let done = download(&drive, &cache, &item, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(done.attempts, 1);
        assert_eq!(done.bytes, 9);
        assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"png-bytes");
        assert!(!cache.partial_path_of("a.png").exists());
    }

    #[tokio::test]
    async fn empty_results_are_retried_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let drive = InMemoryDrive::new("test");
        let item = drive.add("1", "a.png", b"");

        let err = download(&drive, &cache, &item, RetryPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(matches!(err.last, AttemptError::Empty));
        assert_eq!(drive.fetch_count(&item.id), 3);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn recovers_after_transient_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let drive = InMemoryDrive::new("test");
        let item = drive.add("1", "a.png", b"data");
        drive.empty_for_first(&item.id, 2);

        let done = download(&drive, &cache, &item, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(done.attempts, 3);
        assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn fetch_errors_count_as_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let drive = InMemoryDrive::new("test");
        let item = drive.add_failing("1", "a.png");

        let err = download(&drive, &cache, &item, RetryPolicy::new(2))
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert!(matches!(err.last, AttemptError::Drive(DriveError::Network(_))));
    }

    #[test]
    fn policy_allows_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }
}
