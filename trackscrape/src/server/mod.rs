pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get};
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::{Extractor, PageSource};

pub use routes::artist_report;

pub struct AppState<S> {
    pub extractor: Arc<Extractor>,
    pub source: Arc<S>,
    /// Expose error chains in 500 responses.
    pub diagnostic: bool,
}

impl<S> AppState<S> {
    pub fn new(extractor: Extractor, source: S, diagnostic: bool) -> Self {
        Self {
            extractor: Arc::new(extractor),
            source: Arc::new(source),
            diagnostic,
        }
    }
}

// Derived Clone would require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            source: Arc::clone(&self.source),
            diagnostic: self.diagnostic,
        }
    }
}

pub fn router<S: PageSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api", get(routes::artist::<S>))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server.
pub async fn run_server<S: PageSource + 'static>(
    addr: SocketAddr,
    state: AppState<S>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
