//! User accounts and their device grants.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::json;
use crate::password;

/// One account as stored in `users.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Salted digest, never plaintext.
    pub password: String,
    #[serde(default)]
    pub devices: Vec<String>,
}

/// `users.json` keyed by username. A missing file is an empty store.
#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    users: HashMap<String, UserRecord>,
}

impl UserStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = json::load_or_default(&path).await?;
        Ok(Self { path, users })
    }

    /// Constant-time credential check. Unknown users fail the same way
    /// bad passwords do.
    pub fn verify(&self, username: &str, candidate: &str) -> bool {
        self.users
            .get(username)
            .map(|user| password::verify_password(&user.password, candidate))
            .unwrap_or(false)
    }

    /// Device ids granted to a user, `None` for unknown users.
    pub fn device_ids(&self, username: &str) -> Option<Vec<String>> {
        self.users.get(username).map(|user| user.devices.clone())
    }

    /// Create or replace an account. The plaintext is digested before it
    /// is stored, and the file is rewritten.
    pub async fn upsert(
        &mut self,
        username: &str,
        plaintext: &str,
        devices: Vec<String>,
    ) -> Result<(), StoreError> {
        self.users.insert(
            username.to_string(),
            UserRecord {
                password: password::hash_password(plaintext),
                devices,
            },
        );
        self.save().await
    }

    async fn save(&self) -> Result<(), StoreError> {
        json::save_atomic(&self.path, &self.users).await
    }
}
