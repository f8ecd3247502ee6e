//! Shared test helpers for Dropbox API integration tests
//!
//! Provides wiremock-based mock server setup for the Dropbox endpoints.
//! All three API hosts are served by the same mock server.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use partyshow_dropbox::client::DropboxClient;

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns a client pointing at it.
pub async fn setup_dropbox_mock() -> (MockServer, DropboxClient) {
    let server = MockServer::start().await;
    let client = DropboxClient::with_base_url(TEST_TOKEN, server.uri());
    (server, client)
}

/// A `.tag: file` metadata entry inside `/PartyPhotos`.
pub fn file_entry(name: &str, rev: &str) -> Value {
    json!({
        ".tag": "file",
        "name": name,
        "id": format!("id:{rev}"),
        "path_lower": format!("/partyphotos/{}", name.to_lowercase()),
        "path_display": format!("/PartyPhotos/{name}"),
        "rev": rev,
        "size": 1024,
        "content_hash": format!("hash-{rev}")
    })
}

/// A `.tag: deleted` metadata entry inside `/PartyPhotos`.
pub fn deleted_entry(name: &str) -> Value {
    json!({
        ".tag": "deleted",
        "name": name,
        "path_lower": format!("/partyphotos/{}", name.to_lowercase()),
        "path_display": format!("/PartyPhotos/{name}")
    })
}

/// Mounts `list_folder` returning a single page.
pub async fn mount_list_folder(server: &MockServer, entries: Value, cursor: &str) {
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": entries,
            "cursor": cursor,
            "has_more": false
        })))
        .mount(server)
        .await;
}

/// Mounts `list_folder/continue` for a specific incoming cursor.
pub async fn mount_continue(
    server: &MockServer,
    from_cursor: &str,
    entries: Value,
    next_cursor: &str,
    has_more: bool,
) {
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_partial_json(json!({ "cursor": from_cursor })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": entries,
            "cursor": next_cursor,
            "has_more": has_more
        })))
        .mount(server)
        .await;
}

/// Mounts an endpoint answering HTTP 409 with the given error summary.
pub async fn mount_conflict(server: &MockServer, endpoint: &str, summary: &str, tag: &str) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": summary,
            "error": { ".tag": tag }
        })))
        .mount(server)
        .await;
}
