//! JSON-file stores for accounts, devices, and UI settings.
//!
//! Each store owns one file (`users.json`, `devices.json`,
//! `settings.json`), loads it whole, and rewrites it atomically on every
//! change. A missing file behaves as an empty store.

pub mod devices;
pub mod error;
mod json;
pub mod password;
pub mod settings;
pub mod users;

pub use devices::{DeviceRecord, DeviceStore};
pub use error::StoreError;
pub use password::{hash_password, verify_password};
pub use settings::SettingsStore;
pub use users::{UserRecord, UserStore};
