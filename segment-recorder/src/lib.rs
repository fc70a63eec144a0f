//! Supervised, segment-rotating RTSP recordings.
//!
//! Each start request spawns one ffmpeg child writing time-bucketed `.mkv`
//! segments and returns an opaque identifier immediately. The
//! [`SessionRegistry`] is the process-wide table of active sessions and
//! the only holder of their handles; callers interact through identifiers
//! alone. Every session carries a supervisor task so a crashed process is
//! observable as Failed instead of disappearing, and stops are graceful
//! with a bounded escalation to a kill.

pub mod error;
pub mod registry;
pub mod session;

pub use error::RecorderError;
pub use registry::SessionRegistry;
pub use session::{RecorderOptions, RecordingRequest, SessionState, SessionStatus};
