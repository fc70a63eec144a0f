use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("directory not found: {0}")]
    DirectoryMissing(PathBuf),

    #[error("directory not writable: {0}")]
    DirectoryUnwritable(PathBuf),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
