//! Shared fixtures for the integration tests: a mock control plane and
//! scratch artifact directories.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

/// What the mock control plane has been asked to do.
#[derive(Default)]
pub struct Recorded {
    pub portal_loads: usize,
    pub injections: Vec<Value>,
    pub calls: Vec<(String, String, Value)>,
}

/// A control plane on `127.0.0.1:<ephemeral>` that answers like a plugin
/// host with a plugin loaded.
pub struct MockControlPlane {
    pub addr: SocketAddr,
    pub recorded: Arc<Mutex<Recorded>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockControlPlane {
    pub async fn start() -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let router = Router::new()
            .route("/dev", get(portal))
            .route("/plugin/updateTestPlugin", post(inject))
            .route("/plugin/remoteCall", post(remote_call))
            .with_state(Arc::clone(&recorded));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            recorded,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for MockControlPlane {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

type Shared = State<Arc<Mutex<Recorded>>>;

async fn portal(State(recorded): Shared) -> &'static str {
    recorded.lock().unwrap().portal_loads += 1;
    "<html>dev portal</html>"
}

async fn inject(State(recorded): Shared, Json(body): Json<Value>) -> StatusCode {
    recorded.lock().unwrap().injections.push(body);
    StatusCode::OK
}

async fn remote_call(
    State(recorded): Shared,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let id = query.get("id").cloned().unwrap_or_default();
    let method = query.get("method").cloned().unwrap_or_default();
    recorded
        .lock()
        .unwrap()
        .calls
        .push((id, method.clone(), body));

    match method.as_str() {
        "enable" => Json(json!({"ok": true})).into_response(),
        "getHome" => Json(json!({"results": [{"name": "a"}, {"name": "b"}], "hasMore": true}))
            .into_response(),
        "plainText" => "done".into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, format!("unknown method {method}")).into_response(),
    }
}

/// A listener that accepts connections and drops them without answering,
/// which the client sees as a reset or an early close.
pub async fn resetting_listener() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            drop(socket);
        }
    });
    addr
}

/// An address nothing is listening on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener bind");
    listener.local_addr().expect("local addr")
}

/// A fresh directory under the system temp dir.
pub fn scratch_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// A build output with a manifest and a script.
pub fn write_build_output(dir: &Path) {
    std::fs::write(
        dir.join("config.json"),
        r#"{"id":"c0ffee00-0000-4000-8000-000000000001","name":"Example","version":3}"#,
    )
    .expect("write manifest");
    std::fs::write(dir.join("script.js"), "source.enable = function () {};\n")
        .expect("write script");
}
