//! `/api/video` handlers: preview, recordings, snapshots, playback.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use live_preview::{multipart_stream, stream_content_type, FrameSource};
use media_library::{media_file_name, probe_writable, LibraryError};
use segment_recorder::RecordingRequest;
use snapshot_capture::{capture, SnapshotJobRequest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    rtsp_url: Option<String>,
}

/// One viewer, one upstream connection: the response owns a dedicated
/// frame source that dies with it.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let rtsp_url = query
        .rtsp_url
        .ok_or_else(|| ApiError::bad_request("rtsp_url query parameter required"))?;

    let source = FrameSource::open(&rtsp_url, &state.config.frame_source_options()).await?;
    tracing::info!("preview stream opened for {}", rtsp_url);

    let body = Body::from_stream(multipart_stream(source));
    Ok(([(header::CONTENT_TYPE, stream_content_type())], body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RecordStartBody {
    rtsp_url: String,
    device_name: String,
    username: String,
    segment_time: Option<u32>,
}

pub async fn record_start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecordStartBody>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .recordings
        .create(RecordingRequest {
            rtsp_url: body.rtsp_url,
            device_name: body.device_name,
            username: body.username,
            segment_seconds: body.segment_time,
        })
        .await?;

    Ok(Json(json!({
        "status": "success",
        "recording_id": status.recording_id,
        "output_file": status.output_file,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecordStopBody {
    recording_id: String,
}

pub async fn record_stop(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecordStopBody>,
) -> Result<Json<Value>, ApiError> {
    state.recordings.terminate(&body.recording_id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Recording stopped",
    })))
}

pub async fn record_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sessions = state.recordings.list().await;
    Json(json!({ "status": "success", "sessions": sessions }))
}

pub async fn record_status_by_id(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .recordings
        .status(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("No recording process found for id {id}")))?;
    Ok(Json(json!({ "status": "success", "session": session })))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotBody {
    rtsp_url: String,
    device_name: String,
    username: String,
}

pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SnapshotBody>,
) -> Result<Json<Value>, ApiError> {
    let snapshots_dir = state.library.snapshots_dir();
    tokio::fs::create_dir_all(snapshots_dir)
        .await
        .map_err(|_| LibraryError::DirectoryUnwritable(snapshots_dir.to_path_buf()))?;
    probe_writable(snapshots_dir).await?;

    let name = media_file_name(&body.device_name, &body.username, Local::now(), "jpg");
    let path = snapshots_dir.join(&name);
    capture(&body.rtsp_url, &path, &state.config.capture_options()).await?;
    tracing::info!("snapshot {} captured from {}", name, body.rtsp_url);

    Ok(Json(json!({ "status": "success", "snapshot_file": name })))
}

pub async fn snapshots(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let files = state.library.list_snapshots().await?;
    let names: Vec<String> = files.into_iter().map(|f| f.name).collect();
    Ok(Json(json!({ "snapshots": names })))
}

pub async fn records(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let files = state.library.list_records().await?;
    let names: Vec<String> = files.into_iter().map(|f| f.name).collect();
    Ok(Json(json!({ "records": names })))
}

#[derive(Debug, Deserialize)]
pub struct PlaybackQuery {
    video_file: Option<String>,
}

pub async fn playback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlaybackQuery>,
) -> Result<Response, ApiError> {
    let name = query
        .video_file
        .ok_or_else(|| ApiError::not_found("Video file not found"))?;
    let path = match state.library.record_path(&name).await {
        Ok(path) => path,
        Err(LibraryError::FileNotFound(_)) => {
            return Err(ApiError::not_found("Video file not found"));
        }
        Err(e) => return Err(e.into()),
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(LibraryError::Io)?;
    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(header::CONTENT_TYPE, video_content_type(&name))], body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    snapshot_file: Option<String>,
}

pub async fn download_snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let name = query
        .snapshot_file
        .ok_or_else(|| ApiError::not_found("Snapshot file not found"))?;
    let path = match state.library.snapshot_path(&name).await {
        Ok(path) => path,
        Err(LibraryError::FileNotFound(_)) => {
            return Err(ApiError::not_found("Snapshot file not found"));
        }
        Err(e) => return Err(e.into()),
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(LibraryError::Io)?;
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct BackupStartBody {
    rtsp_url: String,
    device_name: String,
    username: String,
    interval: Option<u64>,
    max_snapshots: Option<u32>,
}

pub async fn backup_start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BackupStartBody>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .jobs
        .create(SnapshotJobRequest {
            rtsp_url: body.rtsp_url,
            device_name: body.device_name,
            username: body.username,
            interval_seconds: body.interval,
            max_count: body.max_snapshots,
        })
        .await?;

    Ok(Json(json!({ "status": "success", "job_id": status.job_id })))
}

#[derive(Debug, Deserialize)]
pub struct BackupStopBody {
    job_id: String,
}

pub async fn backup_stop(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BackupStopBody>,
) -> Result<Json<Value>, ApiError> {
    state.jobs.cancel(&body.job_id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Snapshot backup stopped",
    })))
}

pub async fn backup_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let jobs = state.jobs.list().await;
    Json(json!({ "status": "success", "jobs": jobs }))
}

fn video_content_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(
            video_content_type("cam1_alice_20250309-120000.mkv"),
            "video/x-matroska"
        );
        assert_eq!(video_content_type("clip.mp4"), "video/mp4");
        assert_eq!(video_content_type("odd.bin"), "application/octet-stream");
    }
}
