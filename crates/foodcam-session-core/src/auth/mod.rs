//! Authentication module for managing credentials and user sessions.
//!
//! This module provides:
//! - `CredentialStore`: Expiry-bounded token storage over a pluggable backend
//! - `Session`: Login, logout and current-user lookups
//! - `SessionNavigator`: The router hook used when a session cannot be recovered
//!
//! Access tokens are short-lived; the refresh token lives for one day, or
//! thirty when the user asks to stay logged in.

pub mod credentials;
pub mod navigator;
pub mod session;
pub mod storage;

pub use credentials::{Credential, CredentialKey, CredentialStore, TtlClass};
pub use navigator::{redirect_to, NoopNavigator, SessionNavigator};
pub use session::Session;
pub use storage::{FileBackend, KeyringBackend, MemoryBackend, StorageBackend, StorageError, StoredEntry};
