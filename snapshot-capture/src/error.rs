use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("ffmpeg not found - is it installed?")]
    FfmpegNotFound,

    #[error("snapshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("No snapshot job found for id {0}")]
    JobNotFound(String),

    #[error("directory not writable: {0}")]
    DirectoryUnwritable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
