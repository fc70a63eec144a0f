//! Shared JSON file persistence for the stores.
//!
//! Saves go through a temp file in the same directory followed by a
//! rename, so a crash mid-write never leaves a half-written store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Read and parse `path`; a missing file is an empty store.
pub(crate) async fn load_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

pub(crate) async fn save_atomic<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let content = serde_json::to_string_pretty(value)?;
    let tmp = temp_sibling(path);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn missing_file_loads_as_default() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded: HashMap<String, String> =
            load_or_default(&tmp.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        let mut values = HashMap::new();
        values.insert("cam1".to_string(), "Front Door".to_string());

        save_atomic(&path, &values).await.unwrap();
        let loaded: HashMap<String, String> = load_or_default(&path).await.unwrap();
        assert_eq!(loaded, values);

        // No temp file left behind after the rename.
        assert!(!path.with_file_name("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: Result<HashMap<String, String>, _> = load_or_default(&path).await;
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }
}
