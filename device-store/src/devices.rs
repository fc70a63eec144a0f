//! Camera inventory.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::json;

/// One camera as stored in `devices.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub rtsp_url: String,
}

/// `devices.json` keyed by device id. A missing file is an empty store.
#[derive(Debug)]
pub struct DeviceStore {
    path: PathBuf,
    devices: HashMap<String, DeviceRecord>,
}

impl DeviceStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let devices = json::load_or_default(&path).await?;
        Ok(Self { path, devices })
    }

    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    /// All devices, sorted by id for stable listings.
    pub fn list(&self) -> Vec<(String, DeviceRecord)> {
        let mut all: Vec<_> = self
            .devices
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub async fn upsert(&mut self, id: &str, record: DeviceRecord) -> Result<(), StoreError> {
        self.devices.insert(id.to_string(), record);
        self.save().await
    }

    /// Remove a device; reports whether it was present. The file is only
    /// rewritten when something changed.
    pub async fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.devices.remove(id).is_none() {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    async fn save(&self) -> Result<(), StoreError> {
        json::save_atomic(&self.path, &self.devices).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(name: &str, url: &str) -> DeviceRecord {
        DeviceRecord {
            name: name.to_string(),
            rtsp_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("devices.json");

        let mut store = DeviceStore::load(&path).await.unwrap();
        store
            .upsert("cam1", cam("Front Door", "rtsp://cam1/live"))
            .await
            .unwrap();
        store
            .upsert("cam2", cam("Garage", "rtsp://cam2/live"))
            .await
            .unwrap();

        let reloaded = DeviceStore::load(&path).await.unwrap();
        assert_eq!(reloaded.get("cam1").unwrap().name, "Front Door");
        let ids: Vec<String> = reloaded.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["cam1", "cam2"]);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("devices.json");

        let mut store = DeviceStore::load(&path).await.unwrap();
        store
            .upsert("cam1", cam("Front Door", "rtsp://cam1/live"))
            .await
            .unwrap();

        assert!(store.remove("cam1").await.unwrap());
        assert!(!store.remove("cam1").await.unwrap());
        assert!(store.get("cam1").is_none());
    }
}
