//! In-process server for API tests
//!
//! Most requests go straight into the router via `oneshot`. Realtime tests
//! call [`TestServer::serve`] to get a real listening socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use vinyl_player::api::{build_router, AppContext};
use vinyl_player::config::Config;
use vinyl_player::playback::{lock_coordinator, SequencerHandle};
use vinyl_player::SharedState;

use super::fakes::Rig;

pub struct TestServer {
    pub ctx: AppContext,
    pub rig: Rig,
}

impl TestServer {
    pub fn new() -> Self {
        let rig = Rig::new();
        Self::with_rig(rig)
    }

    /// Serve `rig`'s coordinator with its temp folder as the data folder
    pub fn with_rig(rig: Rig) -> Self {
        let mut config = Config::for_data_dir(rig.dir.path());
        // Fast finish checks keep the realtime tests short
        config.poll_interval = Duration::from_millis(50);
        let snapshots = lock_coordinator(&rig.coordinator).subscribe();
        let state = Arc::new(SharedState::new(snapshots, rig.events.clone()));
        let sequencer = SequencerHandle::spawn(rig.coordinator.clone()).unwrap();

        let ctx = AppContext {
            state,
            coordinator: rig.coordinator.clone(),
            sequencer: Arc::new(sequencer),
            config: Arc::new(config),
        };
        Self { ctx, rig }
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    /// Serve the router on an ephemeral local port
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Wait until every submitted command has run
    pub async fn settle(&self) {
        let sequencer = Arc::clone(&self.ctx.sequencer);
        tokio::task::spawn_blocking(move || sequencer.flush())
            .await
            .unwrap()
            .unwrap();
    }

    pub fn write_data_file(&self, name: &str, content: &str) {
        std::fs::write(self.rig.dir.path().join(name), content).unwrap();
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Send one request and decode the body as JSON (`Value::Null` when empty or not JSON)
pub async fn make_request(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}
