pub mod auth;
pub mod files;
pub mod google_drive;

pub use auth::{AuthError, ServiceAccountKey, ServiceAccountTokens, StaticToken, TokenSource};
pub use google_drive::{GoogleDrive, GoogleDriveConfig};
