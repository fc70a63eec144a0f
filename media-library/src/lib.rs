//! Catalog of recorded segments and snapshot images.
//!
//! The server keeps no database of produced media: two flat directories
//! hold everything, and every filename embeds device, user, and capture
//! time. This crate owns that naming scheme plus the directory listing
//! and safe path resolution used by the playback/download routes.

pub mod error;
pub mod files;

pub use error::LibraryError;
pub use files::{
    media_file_name, parse_file_timestamp, probe_writable, sanitize_component, MediaFile,
    MediaLibrary, TIMESTAMP_FORMAT,
};
