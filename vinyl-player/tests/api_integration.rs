//! API integration tests
//!
//! Drive the router in-process and check the JSON the front end relies on.

mod helpers;

use helpers::test_server::{make_request, TestServer};
use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use vinyl_common::events::ServerMessage;
use vinyl_common::protocol::ClientMessage;
use vinyl_player::api::{dispatch_message, Dispatched};

fn play_body(track: &str, start_time: f64) -> String {
    json!({
        "action": "PLAY",
        "payload": {"file_path": track, "title": "Song", "artist": "Band", "start_time": start_time}
    })
    .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new();

    let (status, body) = make_request(server.router(), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "vinyl-player");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_index_redirects_to_front_end() {
    let server = TestServer::new();

    let (status, _) = make_request(server.router(), "GET", "/", None).await;

    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_static_files_served_from_data_folder() {
    let server = TestServer::new();
    std::fs::create_dir_all(server.rig.dir.path().join("static")).unwrap();
    server.write_data_file("static/index.html", "<html></html>");

    let (status, _) = make_request(server.router(), "GET", "/static/index.html", None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_initial_playback_state() {
    let server = TestServer::new();

    let (status, body) = make_request(server.router(), "GET", "/playback/state", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_playing"], false);
    assert_eq!(body["current_track"], Value::Null);
    assert_eq!(body["mode"], "local");
    assert_eq!(body["volume"], 0.5);
}

#[tokio::test]
async fn test_play_command_is_accepted_and_applied() {
    let server = TestServer::new();
    let track = server.rig.audio_file("a.flac");
    let mut events = server.ctx.state.subscribe_events();

    let body = play_body(&track, 0.0);
    let (status, response) = make_request(server.router(), "POST", "/playback/command", Some(&body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response, json!({"status": "accepted", "accepted": "play"}));

    server.settle().await;

    let (_, state) = make_request(server.router(), "GET", "/playback/state", None).await;
    assert_eq!(state["is_playing"], true);
    assert_eq!(state["current_track"], track.as_str());
    assert_eq!(state["title"], "Song");
    assert_eq!(state["artist"], "Band");

    assert_eq!(
        events.recv().await.unwrap(),
        ServerMessage::Playing {
            track: "Song".to_string(),
            artist: "Band".to_string()
        }
    );
}

#[tokio::test]
async fn test_position_reports_active_backend() {
    let server = TestServer::new();
    let track = server.rig.audio_file("a.flac");

    let body = play_body(&track, 0.0);
    make_request(server.router(), "POST", "/playback/command", Some(&body)).await;
    server.settle().await;

    let (status, position) = make_request(server.router(), "GET", "/playback/position", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(position["is_playing"], true);
    assert_eq!(position["duration_seconds"], 180.0);
    assert_eq!(position["nearly_finished"], false);
}

#[tokio::test]
async fn test_malformed_command_is_rejected() {
    let server = TestServer::new();

    let (status, body) = make_request(server.router(), "POST", "/playback/command", Some("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let unknown = r#"{"action":"REWIND","payload":{}}"#;
    let (status, _) = make_request(server.router(), "POST", "/playback/command", Some(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing reached the backends
    server.settle().await;
    assert!(server.rig.calls().is_empty());
}

#[tokio::test]
async fn test_volume_command_clamps() {
    let server = TestServer::new();

    let body = r#"{"action":"VOLUME","payload":{"value":1.7}}"#;
    let (status, response) = make_request(server.router(), "POST", "/playback/command", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["accepted"], "set_volume");

    server.settle().await;
    assert_eq!(server.ctx.state.playback().volume, 1.0);
}

#[tokio::test]
async fn test_update_nav_merges_without_touching_playback() {
    let server = TestServer::new();
    let before = server.ctx.state.playback();

    let body = r#"{"action":"UPDATE_NAV","payload":{"crateIndex":3,"albumId":"abc"}}"#;
    let (status, response) = make_request(server.router(), "POST", "/playback/command", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["accepted"], "navigation");

    let navigation = server.ctx.state.navigation.read().await.clone();
    assert_eq!(navigation.get("crateIndex"), Some(&json!(3)));
    assert_eq!(navigation.get("albumId"), Some(&json!("abc")));
    assert_eq!(navigation.get("sortMode"), Some(&json!("RAW")));

    server.settle().await;
    assert_eq!(server.ctx.state.playback(), before);
    assert!(server.rig.calls().is_empty());
}

#[tokio::test]
async fn test_sync_message_reflects_state() {
    let server = TestServer::new();
    let track = server.rig.audio_file("a.flac");

    let message = ClientMessage::decode(&play_body(&track, 0.0)).unwrap();
    assert_eq!(dispatch_message(&server.ctx, message).await, Ok(Dispatched::Queued("play")));
    server.settle().await;

    let sync = serde_json::to_value(server.ctx.state.sync_message().await).unwrap();
    assert_eq!(sync["status"], "sync");
    assert_eq!(sync["playback"]["isPlaying"], true);
    assert_eq!(sync["playback"]["trackRef"], track.as_str());
    assert_eq!(sync["navigation"]["sortMode"], "RAW");
}

#[tokio::test]
async fn test_commands_after_shutdown_are_refused() {
    let server = TestServer::new();
    server.ctx.sequencer.shutdown();

    let (status, body) = make_request(server.router(), "POST", "/playback/command", Some(r#"{"action":"STOP"}"#)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_library_falls_back_to_empty_list() {
    let server = TestServer::new();

    let (status, body) = make_request(server.router(), "GET", "/api/library", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_library_served_verbatim() {
    let server = TestServer::new();
    server.write_data_file("library.json", r#"[{"title":"Blue Album","discs":[]}]"#);

    let (_, body) = make_request(server.router(), "GET", "/api/library", None).await;

    assert_eq!(body, json!([{"title": "Blue Album", "discs": []}]));
}

#[tokio::test]
async fn test_debug_config_fallbacks() {
    let server = TestServer::new();

    let (status, body) = make_request(server.router(), "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    server.write_data_file("debug_config.json", "{ broken");
    let (_, body) = make_request(server.router(), "GET", "/api/config", None).await;
    assert_eq!(body, json!({}));

    server.write_data_file("debug_config.json", r#"{"showFps":true}"#);
    let (_, body) = make_request(server.router(), "GET", "/api/config", None).await;
    assert_eq!(body, json!({"showFps": true}));
}

#[tokio::test]
async fn test_event_stream_is_sse() {
    let server = TestServer::new();
    let request = http::Request::builder()
        .uri("/events")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(server.router(), request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    // The stream stays open; read only the snapshot it opens with
    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.frame())
        .await
        .expect("no SSE frame within 5s")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.starts_with("event: sync\n"));
    assert!(text.contains(r#""status":"sync""#));
}

#[tokio::test]
async fn test_ws_requires_upgrade() {
    let server = TestServer::new();

    let (status, _) = make_request(server.router(), "GET", "/ws", None).await;

    assert!(status.is_client_error());
}
