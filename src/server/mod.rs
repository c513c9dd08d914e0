//! Axum-based HTTP surface for the ritual.
//!
//! The router owns everything a handler needs through [`AppState`]; CORS is
//! permissive because the expected clients are local game builds and editor
//! sessions on other ports. The server loop wires the shared
//! [`CancellationToken`] into axum's graceful shutdown.

pub mod api;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::archive::MemoryArchive;
use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::sessions::SessionStore;

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted. The session store sits
/// behind one async mutex: requests for any session serialise against each
/// other, which matches the single-file persistence model (and the single
/// player the ritual is built for).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SessionStore>>,
    pub llm: LlmProvider,
    pub archive: Arc<MemoryArchive>,
}

impl AppState {
    pub fn new(store: SessionStore, llm: LlmProvider, archive: MemoryArchive) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            llm,
            archive: Arc::new(archive),
        }
    }
}

/// Build the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/begin", post(api::begin))
        .route("/advance", post(api::advance))
        .route("/archive", post(api::archive))
        .route("/reset", post(api::reset))
        .route("/api/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn run(bind_addr: &str, state: AppState, shutdown: CancellationToken) -> Result<(), AppError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Http(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "pond listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Http(format!("server error: {e}")))?;

    info!("pond shut down");
    Ok(())
}
