//! HTTP surface for the camera service.
//!
//! Wires the preview, recorder, snapshot, store, and relay crates into one
//! axum application: `/api/video/*` for the session lifecycle, `/api/*`
//! for accounts, `/api/live/*` for the broadcast relay, `/api/settings`,
//! and an embedded viewer page at `/`.

use std::future::Future;
use std::sync::Arc;

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod live;
pub mod routes;
pub mod settings;
pub mod state;
pub mod video;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;

/// Serve the API until `shutdown` resolves, then wind down the registries
/// so no recording process outlives the server.
pub async fn run_server(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&state.config.listen).await?;
    tracing::info!("listening on {}", state.config.listen);

    let app = router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    state.wind_down().await;
    Ok(())
}
