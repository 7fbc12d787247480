//! Token store implementations
//!
//! `MemoryTokenStore` holds the pair for the lifetime of the process;
//! `FileTokenStore` persists it to a JSON file so a session survives a
//! restart, under the storage keys from the configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{Session, StoreError, TokenStore};

/// In-memory token store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryTokenStore {
    session: Mutex<Option<Session>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone()))
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.refresh_token.clone()))
    }

    fn set(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError> {
        *self.session.lock().unwrap() = Some(Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        });
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

/// File-backed token store
///
/// The pair is written as a flat JSON object keyed by the configured storage
/// keys. Writes go through a temp file followed by a rename, so the pair is
/// replaced atomically and a crash never leaves a half-rotated session.
pub struct FileTokenStore {
    path: PathBuf,
    access_key: String,
    refresh_key: String,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(
        path: impl Into<PathBuf>,
        access_key: impl Into<String>,
        refresh_key: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            access_key: access_key.into(),
            refresh_key: refresh_key.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_map()?.get(&self.access_key).cloned())
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_map()?.get(&self.refresh_key).cloned())
    }

    fn set(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map().unwrap_or_default();
        map.insert(self.access_key.clone(), access_token.to_string());
        map.insert(self.refresh_key.clone(), refresh_token.to_string());
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map().unwrap_or_default();
        map.remove(&self.access_key);
        map.remove(&self.refresh_key);
        if map.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            self.write_map(&map)
        }
    }
}
