//! File-backed session store: one JSON object of string values.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use broll_auth::{AuthError, SessionStore};

/// Session store persisted as a small JSON map on disk.
///
/// Every write replaces the whole file through a sibling temp file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    /// Creates a store over `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, AuthError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(&raw).map_err(|error| {
            AuthError::Store(format!("corrupt session file {}: {error}", self.path.display()))
        })
    }

    fn read_raw(&self) -> Result<Option<String>, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(store_error("read", &self.path, &error)),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|error| store_error("create", parent, &error))?;
        }

        let encoded = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|error| store_error("write", &staging, &error))?;
        fs::rename(&staging, &self.path).map_err(|error| store_error("replace", &self.path, &error))
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), AuthError> {
        let _held = self
            .guard
            .lock()
            .map_err(|_| AuthError::Store("session file lock poisoned".to_string()))?;
        let mut entries: BTreeMap<String, String> = match self.read_raw()? {
            None => BTreeMap::new(),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "rewriting corrupt session file"
                );
                BTreeMap::new()
            }),
        };
        apply(&mut entries);
        self.write_entries(&entries)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

fn store_error(action: &str, path: &Path, error: &io::Error) -> AuthError {
    AuthError::Store(format!("failed to {action} {}: {error}", path.display()))
}
