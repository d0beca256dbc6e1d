use std::path::Path;
use std::sync::Arc;

use hyperdrive::{Drive, DriveError, FolderId, RemoteItem};
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::auth::TokenSource;
use crate::files::FileList;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";

const PAGE_SIZE: &str = "1000";
const LIST_FIELDS: &str = "nextPageToken, files(id, name)";

/// Configuration for a Google Drive client.
#[derive(Clone)]
pub struct GoogleDriveConfig {
    pub api_base_url: Option<String>,
    pub token_source: Arc<dyn TokenSource>,
}

/// Lists and downloads the files of Google Drive folders.
pub struct GoogleDrive {
    config: GoogleDriveConfig,
    client: reqwest::Client,
}

impl GoogleDrive {
    pub fn new(config: GoogleDriveConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    async fn build_request(&self, url: &str) -> Result<reqwest::RequestBuilder, DriveError> {
        let token = self
            .config
            .token_source
            .token()
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;

        Ok(self
            .client
            .get(url)
            .header("User-Agent", "hyperdrive")
            .bearer_auth(token))
    }
}

/// Map a non-success response onto a drive error.
async fn status_error(response: reqwest::Response) -> DriveError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".into());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DriveError::Auth(format!("HTTP {status}: {body}"))
        }
        _ => DriveError::Network(format!("HTTP {status}: {body}")),
    }
}

/// Escape a value for use inside a single-quoted Drive query string.
fn quote_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait::async_trait]
impl Drive for GoogleDrive {
    fn label(&self) -> &str {
        "google-drive"
    }

    async fn list(&self, folder: &FolderId) -> Result<Vec<RemoteItem>, DriveError> {
        let url = format!("{}/drive/v3/files", self.api_base());
        let query = format!(
            "'{}' in parents and trashed = false",
            quote_literal(folder.as_str())
        );

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .build_request(&url)
                .await?
                .query(&params)
                .send()
                .await
                .map_err(|e| DriveError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(status_error(response).await);
            }

            let page: FileList = response
                .json()
                .await
                .map_err(|e| DriveError::Parse(e.to_string()))?;

            items.extend(
                page.files
                    .into_iter()
                    .map(|file| RemoteItem::new(file.id, file.name)),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(folder = %folder, count = items.len(), "listed drive folder");
        Ok(items)
    }

    async fn fetch(&self, item: &RemoteItem, dest: &Path) -> Result<u64, DriveError> {
        let url = format!("{}/drive/v3/files/{}", self.api_base(), item.id);

        let mut response = self
            .build_request(&url)
            .await?
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound(item.id.clone()));
        }

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_are_unchanged() {
        assert_eq!(quote_literal("1AbC_d-9"), "1AbC_d-9");
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(quote_literal(r"it's"), r"it\'s");
        assert_eq!(quote_literal(r"a\b"), r"a\\b");
        assert_eq!(quote_literal(r"\'"), r"\\\'");
    }
}
