use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("ffmpeg not found - is it installed?")]
    FfmpegNotFound,

    #[error("No recording process found for id {0}")]
    SessionNotFound(String),

    #[error("a recording is already active for {0}")]
    AlreadyRecording(String),

    #[error("directory not writable: {0}")]
    DirectoryUnwritable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
