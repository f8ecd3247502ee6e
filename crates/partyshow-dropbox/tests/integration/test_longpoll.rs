//! Tests for list_folder/longpoll

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use partyshow_core::domain::Cursor;
use partyshow_dropbox::{folder, DropboxError};

use crate::common::*;

#[tokio::test]
async fn test_longpoll_reports_changes_and_backoff() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/longpoll"))
        .and(body_json(json!({ "cursor": "cursor-1", "timeout": 30 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "changes": true, "backoff": 5 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cursor = Cursor::new("cursor-1".into()).unwrap();
    let result = folder::longpoll(&client, &cursor, Duration::from_secs(30))
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.backoff, Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_longpoll_is_unauthenticated() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/longpoll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "changes": false })))
        .mount(&server)
        .await;

    let cursor = Cursor::new("cursor-1".into()).unwrap();
    let result = folder::longpoll(&client, &cursor, Duration::from_secs(30))
        .await
        .unwrap();
    assert!(!result.changed);
    assert_eq!(result.backoff, None);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_longpoll_reset_cursor() {
    let (server, client) = setup_dropbox_mock().await;
    mount_conflict(&server, "/2/files/list_folder/longpoll", "reset/..", "reset").await;

    let cursor = Cursor::new("old".into()).unwrap();
    let err = folder::longpoll(&client, &cursor, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, DropboxError::CursorReset), "got {err:?}");
}
