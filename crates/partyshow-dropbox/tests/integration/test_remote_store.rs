//! Tests for DropboxRemoteStore through the IRemoteStore port

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use partyshow_core::domain::{Cursor, RemotePath};
use partyshow_core::ports::{IRemoteStore, RemoteError};
use partyshow_dropbox::DropboxRemoteStore;

use crate::common::*;

#[tokio::test]
async fn test_store_lists_and_downloads_by_revision() {
    let (server, client) = setup_dropbox_mock().await;
    mount_list_folder(&server, json!([file_entry("20240101_100000 Bob.jpg", "rev7")]), "c1").await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"rev:rev7"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"photo".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let store = DropboxRemoteStore::new(client);
    let folder: RemotePath = "/PartyPhotos".parse().unwrap();
    let listing = store.list_folder(&folder).await.unwrap();
    assert_eq!(listing.entries.len(), 1);

    let mut sink: Vec<u8> = Vec::new();
    let written = store.download(&listing.entries[0], &mut sink).await.unwrap();
    assert_eq!(written, 5);
    assert_eq!(sink, b"photo");
}

#[tokio::test]
async fn test_store_maps_reset_to_port_error() {
    let (server, client) = setup_dropbox_mock().await;
    mount_conflict(&server, "/2/files/list_folder/continue", "reset/..", "reset").await;

    let store = DropboxRemoteStore::new(client);
    let cursor = Cursor::new("old".into()).unwrap();
    let err = store.list_folder_continue(&cursor).await.unwrap_err();
    assert_eq!(err, RemoteError::CursorReset);
}

#[tokio::test]
async fn test_store_uses_replaced_token() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_summary": "invalid_access_token/..",
            "error": { ".tag": "invalid_access_token" }
        })))
        .mount(&server)
        .await;

    let store = DropboxRemoteStore::new(client);
    let root = RemotePath::root();

    let err = store.list_folder(&root).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)), "got {err:?}");

    store.set_access_token("fresh-token").await;
    let listing = store.list_folder(&root).await.unwrap();
    assert!(listing.entries.is_empty());
}
