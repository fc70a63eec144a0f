//! API error envelope.
//!
//! Every failing endpoint answers `{"status": "error", "message": …}` with
//! a matching status code. Collaborator errors convert into this type, so
//! handlers propagate with `?` and the mapping lives in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use broadcast_relay::RelayError;
use device_store::StoreError;
use live_preview::PreviewError;
use media_library::LibraryError;
use segment_recorder::RecorderError;
use snapshot_capture::CaptureError;

use crate::config::ConfigError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!("API error {}: {}", self.status, self.message);
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

impl From<PreviewError> for ApiError {
    fn from(e: PreviewError) -> Self {
        let status = match &e {
            PreviewError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            PreviewError::FfmpegNotFound | PreviewError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<RecorderError> for ApiError {
    fn from(e: RecorderError) -> Self {
        let status = match &e {
            RecorderError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            RecorderError::AlreadyRecording(_) => StatusCode::CONFLICT,
            RecorderError::FfmpegNotFound
            | RecorderError::DirectoryUnwritable(_)
            | RecorderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<CaptureError> for ApiError {
    fn from(e: CaptureError) -> Self {
        let status = match &e {
            CaptureError::JobNotFound(_) => StatusCode::NOT_FOUND,
            CaptureError::FfmpegNotFound
            | CaptureError::CaptureFailed(_)
            | CaptureError::DirectoryUnwritable(_)
            | CaptureError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        let status = match &e {
            LibraryError::InvalidName(_) => StatusCode::BAD_REQUEST,
            LibraryError::FileNotFound(_) | LibraryError::DirectoryMissing(_) => {
                StatusCode::NOT_FOUND
            }
            LibraryError::DirectoryUnwritable(_) | LibraryError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_map_to_expected_statuses() {
        let e: ApiError = RecorderError::SessionNotFound("x".to_string()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e: ApiError = RecorderError::AlreadyRecording("rtsp://cam1".to_string()).into();
        assert_eq!(e.status, StatusCode::CONFLICT);

        let e: ApiError = PreviewError::SourceUnavailable("down".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);

        let e: ApiError = LibraryError::InvalidName("../etc".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e: ApiError = CaptureError::CaptureFailed("no frame".to_string()).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
