//! Tests for list_folder and list_folder/continue

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use partyshow_core::domain::{Cursor, RemotePath};
use partyshow_core::ports::FolderChange;
use partyshow_dropbox::{folder, DropboxError};

use crate::common::*;

fn party_photos() -> RemotePath {
    "/PartyPhotos".parse().unwrap()
}

#[tokio::test]
async fn test_list_folder_single_page() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(body_json(json!({
            "path": "/PartyPhotos",
            "recursive": false,
            "include_deleted": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file_entry("20240101_100000 Bob.jpg", "rev1"),
                { ".tag": "folder", "name": "thumbs", "id": "id:f", "path_lower": "/partyphotos/thumbs" }
            ],
            "cursor": "cursor-1",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = folder::list_folder(&client, &party_photos()).await.unwrap();

    assert_eq!(listing.cursor.as_str(), "cursor-1");
    assert_eq!(listing.entries.len(), 1);
    assert_eq!(listing.entries[0].name.as_str(), "20240101_100000 Bob.jpg");
    assert_eq!(listing.entries[0].revision.as_deref(), Some("rev1"));
}

#[tokio::test]
async fn test_list_folder_follows_has_more() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry("a.jpg", "r1")],
            "cursor": "page-1",
            "has_more": true
        })))
        .mount(&server)
        .await;
    mount_continue(&server, "page-1", json!([file_entry("b.jpg", "r2")]), "final", false).await;

    let listing = folder::list_folder(&client, &party_photos()).await.unwrap();

    let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    assert_eq!(listing.cursor.as_str(), "final");
}

#[tokio::test]
async fn test_list_folder_unauthorized() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_summary": "expired_access_token/..",
            "error": { ".tag": "expired_access_token" }
        })))
        .mount(&server)
        .await;

    let err = folder::list_folder(&client, &party_photos()).await.unwrap_err();
    match err {
        DropboxError::Unauthorized(summary) => assert!(summary.starts_with("expired_access_token")),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_folder_missing_folder() {
    let (server, client) = setup_dropbox_mock().await;
    mount_conflict(&server, "/2/files/list_folder", "path/not_found/..", "path").await;

    let err = folder::list_folder(&client, &party_photos()).await.unwrap_err();
    assert!(matches!(err, DropboxError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_list_folder_server_error() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = folder::list_folder(&client, &party_photos()).await.unwrap_err();
    assert!(matches!(err, DropboxError::ServerError(_)), "got {err:?}");
}

#[tokio::test]
async fn test_continue_returns_changes_in_order() {
    let (server, client) = setup_dropbox_mock().await;
    mount_continue(
        &server,
        "cursor-1",
        json!([
            deleted_entry("Alice - 20240101_120000.jpg"),
            file_entry("Alice - wedding.jpg", "r9")
        ]),
        "cursor-2",
        false,
    )
    .await;

    let cursor = Cursor::new("cursor-1".into()).unwrap();
    let delta = folder::list_folder_continue(&client, &cursor).await.unwrap();

    assert_eq!(delta.cursor.as_str(), "cursor-2");
    assert_eq!(delta.changes.len(), 2);
    assert!(matches!(
        &delta.changes[0],
        FolderChange::Deleted { name, .. } if name.as_str() == "Alice - 20240101_120000.jpg"
    ));
    assert!(matches!(
        &delta.changes[1],
        FolderChange::Added(entry) if entry.name.as_str() == "Alice - wedding.jpg"
    ));
}

#[tokio::test]
async fn test_continue_paginates() {
    let (server, client) = setup_dropbox_mock().await;
    mount_continue(&server, "c1", json!([file_entry("a.jpg", "r1")]), "c2", true).await;
    mount_continue(&server, "c2", json!([file_entry("b.jpg", "r2")]), "c3", false).await;

    let cursor = Cursor::new("c1".into()).unwrap();
    let delta = folder::list_folder_continue(&client, &cursor).await.unwrap();

    assert_eq!(delta.changes.len(), 2);
    assert_eq!(delta.cursor.as_str(), "c3");
}

#[tokio::test]
async fn test_continue_reset_cursor() {
    let (server, client) = setup_dropbox_mock().await;
    mount_conflict(&server, "/2/files/list_folder/continue", "reset/...", "reset").await;

    let cursor = Cursor::new("ancient".into()).unwrap();
    let err = folder::list_folder_continue(&client, &cursor).await.unwrap_err();
    assert!(matches!(err, DropboxError::CursorReset), "got {err:?}");
}
