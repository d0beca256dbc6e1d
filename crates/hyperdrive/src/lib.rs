pub mod asset;
pub mod cache;
pub mod convert;
pub mod download;
pub mod drive;
pub mod item;
pub mod media;
pub mod outcome;
pub mod prune;
pub mod reconcile;
pub mod sync;

pub use asset::Asset;
pub use cache::{CacheDir, CacheError};
pub use convert::{ConvertError, Converters, HeicConverter, MovConverter};
pub use download::RetryPolicy;
pub use drive::{Drive, DriveError};
pub use item::{FolderId, RemoteId, RemoteItem};
pub use outcome::Outcome;
pub use prune::{PruneReason, PruneReport, prune};
pub use reconcile::{ReconcileOptions, ReconcileReport, Reconciler};
pub use sync::{Gallery, SyncError};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
