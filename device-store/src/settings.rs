//! Free-form UI settings.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::json;

/// `settings.json`: a flat JSON object the web UI reads and patches.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl SettingsStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = json::load_or_default(&path).await?;
        Ok(Self { path, values })
    }

    pub fn all(&self) -> Map<String, Value> {
        self.values.clone()
    }

    /// Overlay the posted keys onto the stored map and persist. Keys not
    /// mentioned keep their previous values.
    pub async fn merge(&mut self, updates: Map<String, Value>) -> Result<(), StoreError> {
        for (key, value) in updates {
            self.values.insert(key, value);
        }
        json::save_atomic(&self.path, &self.values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn merge_overlays_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        let mut store = SettingsStore::load(&path).await.unwrap();
        let mut first = Map::new();
        first.insert("theme".to_string(), json!("dark"));
        first.insert("grid".to_string(), json!(4));
        store.merge(first).await.unwrap();

        let mut second = Map::new();
        second.insert("grid".to_string(), json!(9));
        store.merge(second).await.unwrap();

        let reloaded = SettingsStore::load(&path).await.unwrap();
        let all = reloaded.all();
        assert_eq!(all.get("theme"), Some(&json!("dark")));
        assert_eq!(all.get("grid"), Some(&json!(9)));
    }

    #[tokio::test]
    async fn empty_store_is_an_empty_object() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(tmp.path().join("settings.json"))
            .await
            .unwrap();
        assert!(store.all().is_empty());
    }
}
