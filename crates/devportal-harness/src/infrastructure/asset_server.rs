//! Local asset server: hands the plugin build output to the device.
//!
//! The device fetches `script.js` (and anything else the manifest refers to)
//! from this machine, so the server listens on all interfaces by default and
//! answers every response with `Access-Control-Allow-Origin: *`.
//!
//! # Request handling
//!
//! ```text
//! GET /              → <artifact_dir>/config.json
//! GET /<path>        → <artifact_dir>/<path>
//! ..  above the root → 403 Forbidden   (no file-system access)
//! missing file       → 404 Not Found
//! other methods      → 405
//! ```
//!
//! Paths are resolved lexically by
//! [`devportal_core::assets::resolve_request_path`] before the file system
//! is touched.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use devportal_core::assets::{content_type_for, resolve_request_path, PathRejection};
use devportal_core::domain::payload::artifact_url;
use devportal_core::{AssetConfig, HarnessError};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::application::run_session::{AssetPublisher, PublishedAssets};

/// Shared by every request handler.
struct ServeRoot {
    root: PathBuf,
    index_file: String,
}

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Serves the artifact directory until [`AssetServer::shutdown`] is called.
pub struct AssetServer {
    config: AssetConfig,
    advertise_host: String,
    running: Option<Running>,
}

impl AssetServer {
    /// `advertise_host` is the name the device uses to reach this machine;
    /// it ends up in the script URL.
    pub fn new(config: AssetConfig, advertise_host: impl Into<String>) -> Self {
        Self {
            config,
            advertise_host: advertise_host.into(),
            running: None,
        }
    }

    /// The bound address once started.  With port 0 in the configuration
    /// this is where the real port shows up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Binds the listening socket and starts serving in a background task.
    /// Calling it again while running returns the existing address.
    ///
    /// # Errors
    ///
    /// [`HarnessError::MissingArtifacts`] when the artifact directory does
    /// not exist, [`HarnessError::Bind`] when the socket cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, HarnessError> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let root = &self.config.artifact_dir;
        if !tokio::fs::metadata(root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(HarnessError::MissingArtifacts {
                path: root.clone(),
                reason: "directory does not exist".to_string(),
            });
        }

        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HarnessError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| HarnessError::Bind { addr, source })?;

        let app = router(root.clone(), self.config.manifest_file.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!("asset server stopped with error: {e}");
            }
        });

        info!("serving {} on http://{local_addr}", root.display());
        self.running = Some(Running {
            local_addr,
            shutdown_tx,
            task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections, lets in-flight requests finish, and
    /// releases the socket.  No-op when not running.
    pub async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown_tx.send(());
        if let Err(e) = running.task.await {
            warn!("asset server task ended abnormally: {e}");
        }
        info!("asset server on {} stopped", running.local_addr);
    }
}

#[async_trait]
impl AssetPublisher for AssetServer {
    async fn publish(&mut self) -> Result<PublishedAssets, HarnessError> {
        let local_addr = self.start().await?;
        let dir = self.config.artifact_dir.clone();

        let manifest = match load_manifest(&dir, &self.config.manifest_file).await {
            Ok(manifest) => manifest,
            Err(e) => {
                self.shutdown().await;
                return Err(e);
            }
        };

        if !dir.join(&self.config.script_file).is_file() {
            warn!(
                "{} not found in {}; the device will get a 404 for it",
                self.config.script_file,
                dir.display()
            );
        }

        Ok(PublishedAssets {
            script_url: artifact_url(
                &self.advertise_host,
                local_addr.port(),
                &self.config.script_file,
            ),
            manifest,
        })
    }
}

/// Reads and parses the manifest.
async fn load_manifest(dir: &Path, manifest_file: &str) -> Result<Value, HarnessError> {
    let path = dir.join(manifest_file);
    let missing = |reason: String| HarnessError::MissingArtifacts {
        path: path.clone(),
        reason,
    };
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| missing(format!("cannot read manifest: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| missing(format!("manifest is not valid JSON: {e}")))
}

/// The asset router, rooted at `root`.
pub fn router(root: PathBuf, index_file: String) -> Router {
    let state = Arc::new(ServeRoot { root, index_file });
    Router::new()
        .route("/", get(serve_artifact))
        .route("/*path", get(serve_artifact))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn serve_artifact(State(state): State<Arc<ServeRoot>>, uri: Uri) -> Response {
    let request_path = uri.path();
    info!("GET {request_path}");

    let path = match resolve_request_path(&state.root, request_path, &state.index_file) {
        Ok(path) => path,
        Err(PathRejection::Traversal) => {
            warn!("rejected traversal attempt: {request_path}");
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }
        Err(PathRejection::Malformed) => {
            warn!("rejected malformed path: {request_path}");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response(),
        Err(e) => {
            debug!("{}: {e}", path.display());
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}
