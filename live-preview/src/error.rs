use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("ffmpeg not found - is it installed?")]
    FfmpegNotFound,

    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
