//! Backend client tests
//!
//! Playlist extraction and watch-progress reporting against a mocked backend.

use aniflix_player::api::BackendClient;
use aniflix_player::models::ProgressSample;
use aniflix_player::PlayerError;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

const PLAYLIST: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\nseg-0.ts\n#EXT-X-ENDLIST\n";

// =============================================================================
// Extraction Tests
// =============================================================================

#[tokio::test]
async fn test_extract_returns_playlist() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/extract-iqiyi-m3u8")
        .match_body(Matcher::Json(json!({
            "iqiyi_play_url": "https://www.iqiyi.com/v_19rr7p.html"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "success": true, "m3u8_content": PLAYLIST }).to_string())
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let playlist = client
        .extract_playlist("https://www.iqiyi.com/v_19rr7p.html")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(playlist, PLAYLIST);
}

#[tokio::test]
async fn test_extract_failure_reports_backend_reason() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/extract-iqiyi-m3u8")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "error": "video is VIP only"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let err = client.extract_playlist("https://x").await.unwrap_err();

    match err {
        PlayerError::Extraction(reason) => assert_eq!(reason, "video is VIP only"),
        other => panic!("Expected extraction error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_extract_success_without_playlist_is_failure() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/extract-iqiyi-m3u8")
        .with_status(200)
        .with_body(r#"{"success": true, "m3u8_content": "   "}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let err = client.extract_playlist("https://x").await.unwrap_err();
    assert!(matches!(err, PlayerError::Extraction(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_extract_gateway_error_is_retryable() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/extract-iqiyi-m3u8")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let err = client.extract_playlist("https://x").await.unwrap_err();
    assert!(matches!(err, PlayerError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_extract_unreachable_backend_is_transport() {
    // Nothing listens on port 1
    let client =
        BackendClient::new("http://127.0.0.1:1").with_extraction_timeout(Duration::from_secs(2));
    let err = client.extract_playlist("https://x").await.unwrap_err();
    assert!(err.is_retryable(), "got {:?}", err);
}

#[tokio::test]
async fn test_extract_accepts_playlist_text_alias() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/extract-iqiyi-m3u8")
        .with_status(200)
        .with_body(json!({ "success": true, "playlistText": PLAYLIST }).to_string())
        .create_async()
        .await;

    let client = BackendClient::new(format!("{}/", server.url()));
    assert_eq!(client.extract_playlist("https://x").await.unwrap(), PLAYLIST);
}

// =============================================================================
// Progress Tests
// =============================================================================

fn sample(completed: bool) -> ProgressSample {
    ProgressSample {
        episode_id: 77,
        position_seconds: 10.5,
        duration_seconds: 1440.0,
        completed,
    }
}

#[tokio::test]
async fn test_progress_uses_backend_field_names() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/update-watch-progress")
        .match_body(Matcher::Json(json!({
            "episode_id": 77,
            "watch_time": 10.5,
            "total_duration": 1440.0,
            "completed": false
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "Progress updated"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    client.update_progress(&sample(false)).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_progress_refused_by_backend() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/update-watch-progress")
        .with_status(200)
        .with_body(r#"{"success": false, "message": "Not logged in"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let err = client.update_progress(&sample(true)).await.unwrap_err();
    match err {
        PlayerError::Rejected(reason) => assert_eq!(reason, "Not logged in"),
        other => panic!("Expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_progress_http_error_is_transport() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/update-watch-progress")
        .with_status(500)
        .create_async()
        .await;

    let client = BackendClient::new(server.url());
    let err = client.update_progress(&sample(false)).await.unwrap_err();
    assert!(matches!(err, PlayerError::Transport(_)));
}
