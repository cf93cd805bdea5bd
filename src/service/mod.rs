//! HTTP store: accepts uploads into a directory and holds the active selection.

pub mod error;
mod routes;

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::prelude::*;
use crate::settings::ServiceSettings;

const WRITE_PROBE: &str = ".imgdrop-write-probe";

/// JSON envelope shared by every store reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

pub struct StoreState {
    upload_dir: PathBuf,
    current: RwLock<Option<String>>,
}

impl StoreState {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            current: RwLock::new(None),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn current(&self) -> Option<String> {
        self.current.read().unwrap().clone()
    }

    fn set_current(&self, filename: String) {
        *self.current.write().unwrap() = Some(filename);
    }

    /// Path of a stored file, or `None` when `filename` is not a bare file name.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let name = Path::new(filename).file_name()?;
        (name == filename).then(|| self.upload_dir.join(name))
    }
}

/// Creates the upload directory and checks that it is writable.
pub async fn prepare(settings: &ServiceSettings) -> Result<Arc<StoreState>> {
    let dir = &settings.upload_dir;
    tokio::fs::create_dir_all(dir).await?;
    let probe = dir.join(WRITE_PROBE);
    tokio::fs::write(&probe, b"probe").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(Arc::new(StoreState::new(dir)))
}

pub fn router(state: Arc<StoreState>, settings: &ServiceSettings) -> Router {
    let mut router = Router::new()
        .route(
            "/upload",
            post(routes::upload).fallback(routes::method_not_allowed),
        )
        .route(
            "/select-image",
            post(routes::select_image).fallback(routes::method_not_allowed),
        )
        .route("/images", get(routes::list_images))
        .route("/current-image", get(routes::current_image))
        .route("/stream", get(routes::stream))
        .nest_service("/uploads", ServeDir::new(state.upload_dir()));
    if let Some(static_dir) = &settings.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }
    router
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prepares the upload directory and builds the router.
pub async fn build(settings: &ServiceSettings) -> Result<Router> {
    let state = prepare(settings).await?;
    Ok(router(state, settings))
}

/// Serves the store until the process is stopped.
pub async fn serve(settings: &ServiceSettings) -> Result<()> {
    let app = build(settings).await?;
    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        upload_dir = %settings.upload_dir.display(),
        "store listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
