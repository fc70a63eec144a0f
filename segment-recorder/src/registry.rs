//! Process-wide table of active recording sessions.
//!
//! The registry owns the only handles to running sessions; callers keep
//! opaque identifiers. The map lock guards map access alone and is never
//! held across a child wait, so a slow stop on one session never stalls
//! starts, stops, or listings on another.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::RecorderError;
use crate::session::{
    RecorderOptions, RecordingRequest, RecordingSession, SessionStatus,
};

pub struct SessionRegistry {
    records_dir: PathBuf,
    options: RecorderOptions,
    allow_concurrent_per_source: bool,
    sessions: Mutex<HashMap<String, Arc<RecordingSession>>>,
}

impl SessionRegistry {
    pub fn new(records_dir: impl Into<PathBuf>, options: RecorderOptions) -> Self {
        Self {
            records_dir: records_dir.into(),
            options,
            allow_concurrent_per_source: true,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Refuse a second live recording of a source URL that already has one.
    pub fn with_exclusive_sources(mut self) -> Self {
        self.allow_concurrent_per_source = false;
        self
    }

    /// Start a recording and register it under a fresh identifier.
    ///
    /// Returns immediately after the spawn; the recording itself proceeds
    /// in the background under its supervisor.
    pub async fn create(&self, req: RecordingRequest) -> Result<SessionStatus, RecorderError> {
        if !self.allow_concurrent_per_source {
            let sessions = self.sessions.lock().await;
            if has_live_source(&sessions, &req.rtsp_url) {
                return Err(RecorderError::AlreadyRecording(req.rtsp_url.clone()));
            }
        }

        let session = RecordingSession::start(&req, &self.records_dir, &self.options).await?;

        let mut sessions = self.sessions.lock().await;
        if !self.allow_concurrent_per_source && has_live_source(&sessions, session.rtsp_url()) {
            // Lost the race against a concurrent start for the same source.
            drop(sessions);
            session.stop().await;
            return Err(RecorderError::AlreadyRecording(req.rtsp_url));
        }
        let status = session.status();
        sessions.insert(session.id().to_string(), session);
        Ok(status)
    }

    /// Stop a session and drop it from the registry.
    ///
    /// The returned status carries the terminal state the stop reached.
    /// An unknown identifier means the session was never started or was
    /// already stopped; both report `SessionNotFound`.
    pub async fn terminate(&self, id: &str) -> Result<SessionStatus, RecorderError> {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(id)
                .cloned()
                .ok_or_else(|| RecorderError::SessionNotFound(id.to_string()))?
        };

        session.stop().await;

        self.sessions.lock().await.remove(id);
        Ok(session.status())
    }

    /// Snapshot of one session, if it is still registered.
    pub async fn status(&self, id: &str) -> Option<SessionStatus> {
        self.sessions.lock().await.get(id).map(|s| s.status())
    }

    /// Snapshots of every registered session, newest first.
    pub async fn list(&self) -> Vec<SessionStatus> {
        let mut all: Vec<_> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|s| s.status())
            .collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Stop every active session; used on server shutdown.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.sessions.lock().await.drain().collect();
        for (id, session) in drained {
            tracing::info!("stopping recording {} for shutdown", id);
            session.stop().await;
        }
    }
}

fn has_live_source(sessions: &HashMap<String, Arc<RecordingSession>>, url: &str) -> bool {
    sessions
        .values()
        .any(|s| s.rtsp_url() == url && !s.state().is_terminal())
}
