//! Server configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use live_preview::FrameSourceOptions;
use segment_recorder::RecorderOptions;
use snapshot_capture::{CaptureOptions, JobDefaults};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,
    #[serde(default = "default_snapshots_dir")]
    pub snapshots_dir: PathBuf,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,
    #[serde(default = "default_stop_grace_seconds")]
    pub stop_grace_seconds: u64,
    #[serde(default = "default_true")]
    pub allow_concurrent_per_source: bool,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_snapshot_max_count")]
    pub max_count: u32,
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_seconds: u64,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_preview_quality")]
    pub quality: u8,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_devices_file")]
    pub devices_file: PathBuf,
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Default controller address, overridable per request.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("records")
}

fn default_snapshots_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_segment_seconds() -> u32 {
    60
}

fn default_stop_grace_seconds() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_snapshot_interval() -> u64 {
    10
}

fn default_snapshot_max_count() -> u32 {
    30
}

fn default_capture_timeout() -> u64 {
    20
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_preview_quality() -> u8 {
    5
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_session_ttl_hours() -> u64 {
    12
}

fn default_devices_file() -> PathBuf {
    PathBuf::from("devices.json")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            records_dir: default_records_dir(),
            snapshots_dir: default_snapshots_dir(),
            recording: RecordingConfig::default(),
            snapshot: SnapshotConfig::default(),
            preview: PreviewConfig::default(),
            auth: AuthConfig::default(),
            store: StoreConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            segment_seconds: default_segment_seconds(),
            stop_grace_seconds: default_stop_grace_seconds(),
            allow_concurrent_per_source: default_true(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_snapshot_interval(),
            max_count: default_snapshot_max_count(),
            capture_timeout_seconds: default_capture_timeout(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            quality: default_preview_quality(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            devices_file: default_devices_file(),
            settings_file: default_settings_file(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            password: String::new(),
        }
    }
}

impl ServerConfig {
    /// Load config from a specific path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Missing file falls back to defaults; a present but malformed file
    /// is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            ffmpeg_path: self.recording.ffmpeg_path.clone(),
            segment_seconds: self.recording.segment_seconds,
            stop_grace: Duration::from_secs(self.recording.stop_grace_seconds),
            ..RecorderOptions::default()
        }
    }

    pub fn frame_source_options(&self) -> FrameSourceOptions {
        FrameSourceOptions {
            ffmpeg_path: self.preview.ffmpeg_path.clone(),
            quality: self.preview.quality,
            connect_timeout: Duration::from_secs(self.preview.connect_timeout_seconds),
            ..FrameSourceOptions::default()
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            ffmpeg_path: self.snapshot.ffmpeg_path.clone(),
            timeout: Duration::from_secs(self.snapshot.capture_timeout_seconds),
            ..CaptureOptions::default()
        }
    }

    pub fn job_defaults(&self) -> JobDefaults {
        JobDefaults {
            interval: Duration::from_secs(self.snapshot.interval_seconds),
            max_count: self.snapshot.max_count,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_hours * 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.recording.segment_seconds, 60);
        assert_eq!(config.recording.stop_grace_seconds, 5);
        assert!(config.recording.allow_concurrent_per_source);
        assert_eq!(config.snapshot.interval_seconds, 10);
        assert_eq!(config.snapshot.max_count, 30);
        assert_eq!(config.preview.quality, 5);
        assert_eq!(config.auth.session_ttl_hours, 12);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: ServerConfig = toml::from_str(
            "listen = \"127.0.0.1:9000\"\n\n[recording]\nsegment_seconds = 15\n",
        )
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.recording.segment_seconds, 15);
        assert_eq!(config.recording.stop_grace_seconds, 5);
        assert_eq!(config.snapshot.max_count, 30);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("watchpost.toml");

        let mut config = ServerConfig::default();
        config.listen = "127.0.0.1:1234".to_string();
        config.recording.segment_seconds = 30;
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.listen, "127.0.0.1:1234");
        assert_eq!(loaded.recording.segment_seconds, 30);
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = ServerConfig::load(Path::new("/nonexistent/watchpost.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_or_default_tolerates_missing_but_not_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let absent = tmp.path().join("absent.toml");
        assert!(ServerConfig::load_or_default(&absent).is_ok());

        let garbage = tmp.path().join("garbage.toml");
        std::fs::write(&garbage, "not = [valid").unwrap();
        assert!(matches!(
            ServerConfig::load_or_default(&garbage),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn options_reflect_config_values() {
        let mut config = ServerConfig::default();
        config.recording.ffmpeg_path = "/opt/ffmpeg".to_string();
        config.snapshot.capture_timeout_seconds = 7;
        config.preview.quality = 12;

        assert_eq!(config.recorder_options().ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(
            config.capture_options().timeout,
            Duration::from_secs(7)
        );
        assert_eq!(config.frame_source_options().quality, 12);
        assert_eq!(config.session_ttl(), Duration::from_secs(12 * 3600));
    }
}
