//! One supervised recording process.
//!
//! A [`RecordingSession`] owns an ffmpeg child writing time-bucketed
//! segment files. A supervisor task polls the child so an unexpected exit
//! is recorded as Failed instead of vanishing; `stop` requests a graceful
//! exit and escalates to a kill once the grace period runs out.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use media_library::{media_file_name, probe_writable, sanitize_component, TIMESTAMP_FORMAT};

use crate::error::RecorderError;

/// Number of trailing stderr lines kept for failure reports.
const STDERR_TAIL_LINES: usize = 8;

/// Tuning for the ffmpeg segmenting child and its supervision.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Binary to invoke; tests substitute a stub script here.
    pub ffmpeg_path: String,
    /// RTSP transport passed to `-rtsp_transport`.
    pub transport: String,
    /// Segment length used when a request does not carry its own.
    pub segment_seconds: u32,
    /// How long `stop` waits after the termination signal before killing.
    pub stop_grace: Duration,
    /// Supervisor poll interval for unexpected-exit detection.
    pub poll_interval: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            transport: "tcp".to_string(),
            segment_seconds: 60,
            stop_grace: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Parameters of one start request.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingRequest {
    pub rtsp_url: String,
    pub device_name: String,
    pub username: String,
    /// Override for the configured segment length.
    pub segment_seconds: Option<u32>,
}

/// Lifecycle state of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

/// Snapshot of one session, as reported by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub recording_id: String,
    pub rtsp_url: String,
    pub device_name: String,
    pub username: String,
    pub output_file: String,
    pub segment_seconds: u32,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
}

pub(crate) struct RecordingSession {
    id: String,
    rtsp_url: String,
    device_name: String,
    username: String,
    output_file: String,
    segment_seconds: u32,
    started_at: DateTime<Utc>,
    pid: Option<u32>,
    stop_grace: Duration,
    poll_interval: Duration,
    state: watch::Sender<SessionState>,
    failure: std::sync::Mutex<Option<String>>,
    // Holding this lock for the whole stop exchange is what serializes
    // racing stop calls on one session.
    child: Mutex<Option<Child>>,
    stderr_tail: Arc<std::sync::Mutex<VecDeque<String>>>,
    stderr_task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RecordingSession {
    /// Spawn the segmenting child and its supervisor.
    ///
    /// Fails synchronously only when the records directory is unusable or
    /// the binary is missing; anything after a successful spawn surfaces
    /// through the session state instead of an error.
    pub(crate) async fn start(
        req: &RecordingRequest,
        records_dir: &Path,
        opts: &RecorderOptions,
    ) -> Result<Arc<Self>, RecorderError> {
        tokio::fs::create_dir_all(records_dir)
            .await
            .map_err(|_| RecorderError::DirectoryUnwritable(records_dir.to_path_buf()))?;
        probe_writable(records_dir)
            .await
            .map_err(|_| RecorderError::DirectoryUnwritable(records_dir.to_path_buf()))?;

        let device = sanitize_component(&req.device_name);
        let user = sanitize_component(&req.username);
        let segment_seconds = req.segment_seconds.unwrap_or(opts.segment_seconds).max(1);

        // ffmpeg expands the strftime placeholders when it opens each
        // segment; the reported output_file is the expansion at start time.
        let pattern = records_dir.join(format!("{device}_{user}_{TIMESTAMP_FORMAT}.mkv"));
        let output_file = records_dir
            .join(media_file_name(
                &req.device_name,
                &req.username,
                Local::now(),
                "mkv",
            ))
            .display()
            .to_string();

        let mut child = Command::new(&opts.ffmpeg_path)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-rtsp_transport")
            .arg(&opts.transport)
            .arg("-i")
            .arg(&req.rtsp_url)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(segment_seconds.to_string())
            .arg("-segment_format")
            .arg("matroska")
            .arg("-strftime")
            .arg("1")
            .arg("-reset_timestamps")
            .arg("1")
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecorderError::FfmpegNotFound
                } else {
                    RecorderError::Io(e)
                }
            })?;

        // Drain stderr in the background, keeping a short tail so a crash
        // report can say why ffmpeg gave up.
        let stderr_tail = Arc::new(std::sync::Mutex::new(VecDeque::new()));
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = tokio::io::BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let mut tail = tail.lock().unwrap_or_else(|p| p.into_inner());
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            })
        });

        let pid = child.id();
        let (state, _) = watch::channel(SessionState::Running);

        let session = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            rtsp_url: req.rtsp_url.clone(),
            device_name: req.device_name.clone(),
            username: req.username.clone(),
            output_file,
            segment_seconds,
            started_at: Utc::now(),
            pid,
            stop_grace: opts.stop_grace,
            poll_interval: opts.poll_interval,
            state,
            failure: std::sync::Mutex::new(None),
            child: Mutex::new(Some(child)),
            stderr_tail,
            stderr_task: std::sync::Mutex::new(stderr_task),
        });

        tracing::info!(
            "recording {} started for {} -> {}",
            session.id,
            session.rtsp_url,
            session.output_file
        );

        let supervisor = Arc::clone(&session);
        tokio::spawn(async move { supervisor.supervise().await });

        Ok(session)
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn rtsp_url(&self) -> &str {
        &self.rtsp_url
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            recording_id: self.id.clone(),
            rtsp_url: self.rtsp_url.clone(),
            device_name: self.device_name.clone(),
            username: self.username.clone(),
            output_file: self.output_file.clone(),
            segment_seconds: self.segment_seconds,
            state: self.state(),
            failure: self
                .failure
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .clone(),
            started_at: self.started_at,
        }
    }

    /// Ask the child to exit, escalating to a kill after the grace period.
    ///
    /// Returns the resulting terminal state: Stopped for a timely exit,
    /// Failed when the process had to be killed. Calling stop on a session
    /// that already reached a terminal state just reports that state.
    pub(crate) async fn stop(&self) -> SessionState {
        let mut guard = self.child.lock().await;
        let Some(mut child) = guard.take() else {
            // The supervisor (or an earlier stop) already reaped the child.
            return self.state();
        };
        self.state.send_replace(SessionState::Stopping);

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            unsafe {
                nix::libc::kill(pid as i32, nix::libc::SIGTERM);
            }
        }
        #[cfg(not(unix))]
        let _ = child.start_kill();

        let deadline = tokio::time::Instant::now() + self.stop_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!("recording {} stopped ({})", self.id, status);
                    self.state.send_replace(SessionState::Stopped);
                    return SessionState::Stopped;
                }
                Ok(None) if tokio::time::Instant::now() >= deadline => {
                    let _ = child.kill().await;
                    self.drain_stderr().await;
                    self.fail(format!(
                        "did not exit within {:?} after the stop signal; force-killed",
                        self.stop_grace
                    ));
                    return SessionState::Failed;
                }
                Ok(None) => tokio::time::sleep(Duration::from_millis(50)).await,
                Err(e) => {
                    let _ = child.kill().await;
                    self.fail(format!("wait on recording process failed: {e}"));
                    return SessionState::Failed;
                }
            }
        }
    }

    /// Poll the child until it exits or the session leaves Running.
    ///
    /// An exit nobody asked for moves the session to Failed so the crash
    /// stays visible to status queries.
    async fn supervise(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let mut guard = self.child.lock().await;
            if self.state() != SessionState::Running {
                return;
            }
            let Some(child) = guard.as_mut() else {
                return;
            };
            match child.try_wait() {
                Ok(None) => {}
                Ok(Some(status)) => {
                    *guard = None;
                    // Failed goes out before the slot unlocks; a stop()
                    // racing the stderr drain must see a terminal state,
                    // not Running. The reason is enriched once the drain
                    // finishes.
                    self.store_failure(format!(
                        "recording process exited unexpectedly ({status})"
                    ));
                    self.state.send_replace(SessionState::Failed);
                    drop(guard);
                    self.drain_stderr().await;
                    self.fail(format!(
                        "recording process exited unexpectedly ({}): {}",
                        status,
                        self.stderr_summary()
                    ));
                    return;
                }
                Err(e) => {
                    *guard = None;
                    self.fail(format!("recording process lost: {e}"));
                    return;
                }
            }
        }
    }

    fn fail(&self, reason: String) {
        tracing::error!("recording {}: {}", self.id, reason);
        self.store_failure(reason);
        self.state.send_replace(SessionState::Failed);
    }

    fn store_failure(&self, reason: String) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(reason);
    }

    /// Let the stderr drain reach EOF so the tail is complete.
    async fn drain_stderr(&self) {
        let task = self
            .stderr_task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(task) = task {
            let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
        }
    }

    fn stderr_summary(&self) -> String {
        let tail = self.stderr_tail.lock().unwrap_or_else(|p| p.into_inner());
        if tail.is_empty() {
            "no diagnostic output".to_string()
        } else {
            tail.iter().cloned().collect::<Vec<_>>().join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Running.is_terminal());
        assert!(!SessionState::Stopping.is_terminal());
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionState::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&SessionState::Failed).unwrap(),
            "\"failed\""
        );
    }
}
