//! Still-image capture from RTSP sources.
//!
//! [`capture`] pulls a single frame through ffmpeg under a hard timeout.
//! [`JobRegistry`] layers periodic capture on top: bounded jobs that fire
//! on an interval, tracked and cancellable like recording sessions.

pub mod capture;
pub mod error;
pub mod job;

pub use capture::{capture, CaptureOptions};
pub use error::CaptureError;
pub use job::{JobDefaults, JobRegistry, JobState, JobStatus, SnapshotJobRequest};
