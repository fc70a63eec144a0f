//! Live camera preview streaming.
//!
//! Turns an RTSP URL into an HTTP `multipart/x-mixed-replace` JPEG stream
//! for a single viewer connection.
//!
//! # Features
//! - One ffmpeg child per viewer emitting MJPEG on stdout (`-f mjpeg -`)
//! - Frame splitting at the JPEG SOI/EOI markers, tolerant of reads that
//!   cut a marker in half
//! - Fail-fast `open`: no first frame within the connect timeout means the
//!   viewer gets an error instead of a stalled response
//! - Children are spawned with `kill_on_drop`, so a dropped stream always
//!   releases the upstream connection
//!
//! # Example
//! ```ignore
//! use live_preview::{FrameSource, FrameSourceOptions, multipart_stream};
//!
//! let opts = FrameSourceOptions::default();
//! let source = FrameSource::open("rtsp://camera/stream", &opts).await?;
//! let body = axum::body::Body::from_stream(multipart_stream(source));
//! ```

pub mod error;
pub mod frame;
pub mod stream;

pub use error::PreviewError;
pub use frame::{FrameSource, FrameSourceOptions};
pub use stream::{multipart_stream, stream_content_type, STREAM_BOUNDARY};
