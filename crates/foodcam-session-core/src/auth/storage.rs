//! Storage mechanisms that can sit underneath the credential store.
//!
//! Each backend persists [`StoredEntry`] records under string keys. Expiry is
//! recorded next to the value, never inside it, and is enforced by the
//! [`CredentialStore`](super::CredentialStore) on read.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TtlClass;

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "foodcam-session";

/// Credential file name in the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored credentials are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain operation failed: {0}")]
    Keychain(String),

    #[error("Credential lifetime is out of range")]
    LifetimeOverflow,
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        StorageError::Keychain(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub ttl: TtlClass,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// A key/value storage mechanism.
///
/// Implementations report faults as errors; deciding what a fault means for
/// the session is left to the credential store.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError>;

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError>;

    /// Deleting a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// JSON file storage, one file holding every entry.
///
/// Writes are read-modify-write under a process-local lock, so keys the
/// credential store does not own survive untouched.
pub struct FileBackend {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(CREDENTIALS_FILE),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredEntry>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self, entries: &HashMap<String, StoredEntry>) -> Result<(), StorageError> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        let _guard = lock(&self.guard);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), entry);
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// OS keychain storage via `keyring`. The entry record is the keychain secret.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a distinct keychain service, e.g. one per backend origin
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for KeyringBackend {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(serde_json::from_str(&secret)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        let secret = serde_json::to_string(&entry)?;
        self.entry(key)?.set_password(&secret)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
