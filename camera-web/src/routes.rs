//! Router assembly.

use std::sync::Arc;

use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::{account, live, settings, video};

/// Embedded single-file viewer page.
const INDEX_PAGE: &str = include_str!("../static/index.html");

/// Create the full API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/login", post(account::login))
        .route("/api/logout", post(account::logout))
        .route("/api/user/devices", get(account::user_devices))
        .route("/api/video/stream", get(video::stream))
        .route("/api/video/record/start", post(video::record_start))
        .route("/api/video/record/stop", post(video::record_stop))
        .route("/api/video/record/status", get(video::record_status))
        .route(
            "/api/video/record/status/{id}",
            get(video::record_status_by_id),
        )
        .route("/api/video/snapshot", post(video::snapshot))
        .route("/api/video/snapshots", get(video::snapshots))
        .route("/api/video/records", get(video::records))
        .route("/api/video/playback", get(video::playback))
        .route("/api/video/download_snapshot", get(video::download_snapshot))
        .route("/api/video/snapshots/backup", post(video::backup_start))
        .route("/api/video/snapshots/backup/stop", post(video::backup_stop))
        .route(
            "/api/video/snapshots/backup/status",
            get(video::backup_status),
        )
        .route("/api/live/start", post(live::start))
        .route("/api/live/stop", post(live::stop))
        .route("/api/live/status", get(live::status))
        .route(
            "/api/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
