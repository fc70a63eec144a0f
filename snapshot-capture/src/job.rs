//! Periodic snapshot jobs.
//!
//! A job drives [`capture`](crate::capture::capture) on a fixed interval
//! for a bounded number of rounds, writing a fresh timestamped file each
//! time. Jobs follow the same shape as recording sessions: registered
//! under a generated identifier, observable while they run, and
//! individually cancellable.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use media_library::{media_file_name, probe_writable};

use crate::capture::{capture, CaptureOptions};
use crate::error::CaptureError;

/// Values applied when a request leaves interval or count unset.
#[derive(Debug, Clone)]
pub struct JobDefaults {
    pub interval: Duration,
    pub max_count: u32,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_count: 30,
        }
    }
}

/// What a caller supplies to start a periodic job.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotJobRequest {
    pub rtsp_url: String,
    pub device_name: String,
    pub username: String,
    pub interval_seconds: Option<u64>,
    pub max_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Completed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Point-in-time view of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    pub rtsp_url: String,
    pub device_name: String,
    pub username: String,
    pub interval_seconds: u64,
    pub max_count: u32,
    pub attempted: u32,
    pub captured: u32,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
}

struct SnapshotJob {
    id: String,
    rtsp_url: String,
    device_name: String,
    username: String,
    interval: Duration,
    max_count: u32,
    attempted: AtomicU32,
    captured: AtomicU32,
    started_at: DateTime<Utc>,
    state: watch::Sender<JobState>,
    cancel: watch::Sender<bool>,
}

impl SnapshotJob {
    fn status(&self) -> JobStatus {
        JobStatus {
            job_id: self.id.clone(),
            rtsp_url: self.rtsp_url.clone(),
            device_name: self.device_name.clone(),
            username: self.username.clone(),
            interval_seconds: self.interval.as_secs(),
            max_count: self.max_count,
            attempted: self.attempted.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
            state: *self.state.borrow(),
            started_at: self.started_at,
        }
    }

    async fn run(self: Arc<Self>, snapshots_dir: PathBuf, opts: CaptureOptions) {
        let mut cancel_rx = self.cancel.subscribe();
        loop {
            if *cancel_rx.borrow_and_update() {
                self.finish(JobState::Cancelled);
                return;
            }

            // Second-resolution timestamps: two captures inside the same
            // second reuse the name and the later frame wins.
            let name = media_file_name(&self.device_name, &self.username, Local::now(), "jpg");
            let path = snapshots_dir.join(&name);
            self.attempted.fetch_add(1, Ordering::Relaxed);

            tokio::select! {
                _ = cancel_rx.changed() => {
                    // The abandoned capture kills its child; a torn file
                    // must not survive the cancel.
                    let _ = tokio::fs::remove_file(&path).await;
                    self.finish(JobState::Cancelled);
                    return;
                }
                result = capture(&self.rtsp_url, &path, &opts) => match result {
                    Ok(()) => {
                        self.captured.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("snapshot job {} wrote {}", self.id, name);
                    }
                    Err(e) => {
                        // Keep going; the counters expose the failures.
                        tracing::warn!("snapshot job {} capture failed: {}", self.id, e);
                    }
                },
            }

            if self.attempted.load(Ordering::Relaxed) >= self.max_count {
                self.finish(JobState::Completed);
                return;
            }

            tokio::select! {
                _ = cancel_rx.changed() => {
                    self.finish(JobState::Cancelled);
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    fn finish(&self, state: JobState) {
        tracing::info!(
            "snapshot job {} finished {:?}: {}/{} captures",
            self.id,
            state,
            self.captured.load(Ordering::Relaxed),
            self.attempted.load(Ordering::Relaxed)
        );
        self.state.send_replace(state);
    }
}

/// Live periodic jobs, keyed by job id.
///
/// Finished jobs stay visible until a cancel acknowledges them, so a
/// caller polling a completed job still sees its final counters.
pub struct JobRegistry {
    snapshots_dir: PathBuf,
    options: CaptureOptions,
    defaults: JobDefaults,
    jobs: Mutex<HashMap<String, Arc<SnapshotJob>>>,
}

impl JobRegistry {
    pub fn new(
        snapshots_dir: impl Into<PathBuf>,
        options: CaptureOptions,
        defaults: JobDefaults,
    ) -> Self {
        Self {
            snapshots_dir: snapshots_dir.into(),
            options,
            defaults,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start a periodic job and register it.
    pub async fn create(&self, request: SnapshotJobRequest) -> Result<JobStatus, CaptureError> {
        tokio::fs::create_dir_all(&self.snapshots_dir)
            .await
            .map_err(|_| CaptureError::DirectoryUnwritable(self.snapshots_dir.clone()))?;
        probe_writable(&self.snapshots_dir)
            .await
            .map_err(|_| CaptureError::DirectoryUnwritable(self.snapshots_dir.clone()))?;

        let interval = request
            .interval_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.defaults.interval);
        let max_count = request.max_count.unwrap_or(self.defaults.max_count).max(1);

        let (state, _) = watch::channel(JobState::Running);
        let (cancel, _) = watch::channel(false);
        let job = Arc::new(SnapshotJob {
            id: Uuid::new_v4().to_string(),
            rtsp_url: request.rtsp_url,
            device_name: request.device_name,
            username: request.username,
            interval,
            max_count,
            attempted: AtomicU32::new(0),
            captured: AtomicU32::new(0),
            started_at: Utc::now(),
            state,
            cancel,
        });

        tracing::info!(
            "snapshot job {} started for {}: {} shots every {:?}",
            job.id,
            job.rtsp_url,
            max_count,
            interval
        );

        tokio::spawn(Arc::clone(&job).run(self.snapshots_dir.clone(), self.options.clone()));

        let status = job.status();
        self.jobs.lock().await.insert(job.id.clone(), job);
        Ok(status)
    }

    /// Cancel a job, wait for it to wind down, and drop it from the
    /// registry. Cancelling an already finished job just acknowledges it.
    pub async fn cancel(&self, id: &str) -> Result<JobStatus, CaptureError> {
        let job = {
            let jobs = self.jobs.lock().await;
            jobs.get(id)
                .cloned()
                .ok_or_else(|| CaptureError::JobNotFound(id.to_string()))?
        };

        job.cancel.send_replace(true);
        let mut state_rx = job.state.subscribe();
        while !state_rx.borrow_and_update().is_terminal() {
            if state_rx.changed().await.is_err() {
                break;
            }
        }

        self.jobs.lock().await.remove(id);
        Ok(job.status())
    }

    pub async fn status(&self, id: &str) -> Option<JobStatus> {
        let jobs = self.jobs.lock().await;
        jobs.get(id).map(|job| job.status())
    }

    /// All registered jobs, newest first.
    pub async fn list(&self) -> Vec<JobStatus> {
        let jobs = self.jobs.lock().await;
        let mut statuses: Vec<JobStatus> = jobs.values().map(|job| job.status()).collect();
        statuses.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        statuses
    }

    /// Cancel every registered job. Used on server shutdown.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = {
            let jobs = self.jobs.lock().await;
            jobs.keys().cloned().collect()
        };
        for id in ids {
            if let Err(e) = self.cancel(&id).await {
                tracing::warn!("shutdown of snapshot job {} failed: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_is_live() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn requests_fall_back_to_defaults() {
        let defaults = JobDefaults::default();
        assert_eq!(defaults.interval, Duration::from_secs(10));
        assert_eq!(defaults.max_count, 30);
    }
}
