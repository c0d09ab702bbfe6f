use std::fmt;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::storage::{StorageBackend, StorageError, StoredEntry};
use crate::config::SessionConfig;

/// Key used by [`CredentialStore::probe`]; never one of the credential keys
const PROBE_KEY: &str = "storage_probe";

/// The keys the credential store owns. Nothing else is ever written or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 2] = [CredentialKey::AccessToken, CredentialKey::RefreshToken];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime class of a stored credential.
///
/// `Extended` is only chosen for an explicit "remember me" at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    #[default]
    Short,
    Extended,
}

/// Point-in-time snapshot of both tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            refresh_token: None,
        }
    }
}

/// Expiry-bounded token storage over a pluggable [`StorageBackend`].
///
/// Reads never fail: a backend fault is logged and reported as an absent
/// value, so callers degrade to an unauthenticated session.
pub struct CredentialStore {
    backend: Box<dyn StorageBackend>,
    short_ttl: Duration,
    extended_ttl: Duration,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn StorageBackend>, short_ttl: Duration, extended_ttl: Duration) -> Self {
        Self {
            backend,
            short_ttl,
            extended_ttl,
        }
    }

    pub fn from_config(backend: Box<dyn StorageBackend>, config: &SessionConfig) -> Self {
        Self::new(
            backend,
            config.ttl(TtlClass::Short),
            config.ttl(TtlClass::Extended),
        )
    }

    pub fn get(&self, key: CredentialKey) -> Option<String> {
        self.read_entry(key).map(|entry| entry.value)
    }

    pub fn set(&self, key: CredentialKey, value: &str, ttl: TtlClass) -> Result<(), StorageError> {
        let lifetime = match ttl {
            TtlClass::Short => self.short_ttl,
            TtlClass::Extended => self.extended_ttl,
        };
        Self::expiring_entry(value, ttl, lifetime)
            .and_then(|entry| self.backend.write(key.as_str(), entry))
            .inspect_err(|e| {
                warn!(key = %key, error = %e, "Failed to store credential");
            })
    }

    pub fn remove(&self, key: CredentialKey) {
        if let Err(e) = self.backend.delete(key.as_str()) {
            warn!(key = %key, error = %e, "Failed to remove credential");
        }
    }

    /// Remove both tokens and nothing else
    pub fn clear(&self) {
        for key in CredentialKey::ALL {
            self.remove(key);
        }
        debug!("Credentials cleared");
    }

    pub fn snapshot(&self) -> Credential {
        Credential {
            access_token: self.get(CredentialKey::AccessToken),
            refresh_token: self.get(CredentialKey::RefreshToken),
        }
    }

    /// Lifetime class chosen at login, recovered from the refresh token entry
    pub fn session_ttl(&self) -> TtlClass {
        self.read_entry(CredentialKey::RefreshToken)
            .map(|entry| entry.ttl)
            .unwrap_or_default()
    }

    /// Check that the backend accepts writes, leaving credential keys untouched
    pub fn probe(&self) -> bool {
        let works = Self::expiring_entry("probe", TtlClass::Short, self.short_ttl)
            .and_then(|entry| self.backend.write(PROBE_KEY, entry))
            .is_ok()
            && matches!(self.backend.read(PROBE_KEY), Ok(Some(ref e)) if e.value == "probe");
        if let Err(e) = self.backend.delete(PROBE_KEY) {
            debug!(error = %e, "Failed to remove storage probe entry");
        }
        works
    }

    fn expiring_entry(value: &str, ttl: TtlClass, lifetime: Duration) -> Result<StoredEntry, StorageError> {
        let expires_at = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or(StorageError::LifetimeOverflow)?;
        Ok(StoredEntry {
            value: value.to_string(),
            ttl,
            expires_at,
        })
    }

    fn read_entry(&self, key: CredentialKey) -> Option<StoredEntry> {
        match self.backend.read(key.as_str()) {
            Ok(Some(entry)) if entry.is_expired() => {
                debug!(key = %key, "Stored credential expired");
                self.remove(key);
                None
            }
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Credential storage unreadable, treating as absent");
                None
            }
        }
    }
}
