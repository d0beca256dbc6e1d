use std::sync::Arc;

use hyperdrive::{Drive, DriveError, RemoteItem};
use hyperdrive_gdrive::{GoogleDrive, GoogleDriveConfig, StaticToken};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn drive_for(server: &MockServer) -> GoogleDrive {
    GoogleDrive::new(GoogleDriveConfig {
        api_base_url: Some(server.uri()),
        token_source: Arc::new(StaticToken::new("test-token")),
    })
}

#[tokio::test]
async fn fetch_streams_media_into_destination() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/1AbCdEfGh"))
        .and(query_param("alt", "media"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(".sunset.png.part");
    let item = RemoteItem::new("1AbCdEfGh", "sunset.png");

    let written = drive_for(&server).fetch(&item, &dest).await.unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn fetch_truncates_existing_destination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.png");
    std::fs::write(&dest, b"much longer stale content").unwrap();

    drive_for(&server)
        .fetch(&RemoteItem::new("abc", "a.png"), &dest)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"new");
}

#[tokio::test]
async fn fetch_empty_body_reports_zero_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let written = drive_for(&server)
        .fetch(&RemoteItem::new("empty", "a.png"), &dir.path().join("a.png"))
        .await
        .unwrap();

    assert_eq!(written, 0);
}

#[tokio::test]
async fn fetch_missing_file_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.png");

    let err = drive_for(&server)
        .fetch(&RemoteItem::new("gone", "a.png"), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::NotFound(ref id) if id.as_str() == "gone"));
    assert!(!dest.exists(), "nothing should be written on 404");
}

#[tokio::test]
async fn fetch_forbidden_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/secret"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = drive_for(&server)
        .fetch(&RemoteItem::new("secret", "a.png"), &dir.path().join("a.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn fetch_into_missing_directory_is_io_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = drive_for(&server)
        .fetch(
            &RemoteItem::new("abc", "a.png"),
            &dir.path().join("missing").join("a.png"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Io(_)), "got {err:?}");
}
