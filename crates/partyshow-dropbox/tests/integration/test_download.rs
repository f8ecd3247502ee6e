//! Tests for streaming downloads

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use partyshow_dropbox::DropboxError;

use crate::common::*;

#[tokio::test]
async fn test_download_streams_body_into_sink() {
    let (server, client) = setup_dropbox_mock().await;
    let body = vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(header("Dropbox-API-Arg", r#"{"path":"rev:a1c10ce0dd78"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink: Vec<u8> = Vec::new();
    let written = client
        .download_to("rev:a1c10ce0dd78", &mut sink)
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(sink, body);
}

#[tokio::test]
async fn test_download_escapes_non_ascii_path() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header(
            "Dropbox-API-Arg",
            r#"{"path":"/partyphotos/\u82b1\u5b50.jpg"}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink: Vec<u8> = Vec::new();
    client
        .download_to("/partyphotos/花子.jpg", &mut sink)
        .await
        .unwrap();
    assert_eq!(sink, b"ok");
}

#[tokio::test]
async fn test_download_not_found() {
    let (server, client) = setup_dropbox_mock().await;
    mount_conflict(&server, "/2/files/download", "path/not_found/...", "path").await;

    let mut sink: Vec<u8> = Vec::new();
    let err = client
        .download_to("/partyphotos/gone.jpg", &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, DropboxError::NotFound(_)), "got {err:?}");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_download_rate_limited() {
    let (server, client) = setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "12")
                .set_body_json(json!({
                    "error_summary": "too_many_requests/..",
                    "error": { "reason": { ".tag": "too_many_requests" }, "retry_after": 12 }
                })),
        )
        .mount(&server)
        .await;

    let mut sink: Vec<u8> = Vec::new();
    let err = client.download_to("/partyphotos/a.jpg", &mut sink).await.unwrap_err();

    match err {
        DropboxError::TooManyRequests { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(12));
        }
        other => panic!("expected TooManyRequests, got {other:?}"),
    }
}
