//! Shared server state.

use tokio::sync::Mutex;

use broadcast_relay::RelayClient;
use device_store::{DeviceStore, SettingsStore, StoreError, UserStore};
use media_library::MediaLibrary;
use segment_recorder::SessionRegistry;
use snapshot_capture::JobRegistry;

use crate::auth::AuthSessions;
use crate::config::ServerConfig;

/// Everything the handlers share, wired once at startup.
pub struct AppState {
    pub config: ServerConfig,
    pub library: MediaLibrary,
    pub recordings: SessionRegistry,
    pub jobs: JobRegistry,
    pub auth: AuthSessions,
    pub relay: RelayClient,
    pub users: Mutex<UserStore>,
    pub devices: Mutex<DeviceStore>,
    pub settings: Mutex<SettingsStore>,
}

impl AppState {
    /// Build registries and load the stores named by the config.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StoreError> {
        let library = MediaLibrary::new(&config.records_dir, &config.snapshots_dir);

        let mut recordings = SessionRegistry::new(&config.records_dir, config.recorder_options());
        if !config.recording.allow_concurrent_per_source {
            recordings = recordings.with_exclusive_sources();
        }

        let jobs = JobRegistry::new(
            &config.snapshots_dir,
            config.capture_options(),
            config.job_defaults(),
        );

        let auth = AuthSessions::new(config.session_ttl());
        let users = Mutex::new(UserStore::load(&config.auth.users_file).await?);
        let devices = Mutex::new(DeviceStore::load(&config.store.devices_file).await?);
        let settings = Mutex::new(SettingsStore::load(&config.store.settings_file).await?);

        Ok(Self {
            config,
            library,
            recordings,
            jobs,
            auth,
            relay: RelayClient::default(),
            users,
            devices,
            settings,
        })
    }

    /// Stop every recording and snapshot job. Called on shutdown.
    pub async fn wind_down(&self) {
        self.recordings.shutdown().await;
        self.jobs.shutdown().await;
    }
}
