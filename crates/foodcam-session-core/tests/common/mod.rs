#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use foodcam_session_core::auth::{CredentialKey, MemoryBackend, TtlClass};
use foodcam_session_core::{ApiClient, CredentialStore, SessionConfig, SessionNavigator};
use wiremock::MockServer;

/// Router stand-in that records every navigation
#[derive(Default)]
pub struct RecordingNavigator {
    route: Mutex<Option<String>>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Self {
        Self {
            route: Mutex::new(Some(route.to_string())),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl SessionNavigator for RecordingNavigator {
    fn current_route(&self) -> Option<String> {
        self.route.lock().unwrap().clone()
    }

    fn navigate_to(&self, route: &str) {
        *self.route.lock().unwrap() = Some(route.to_string());
        self.visits.lock().unwrap().push(route.to_string());
    }
}

pub fn config(server: &MockServer) -> SessionConfig {
    SessionConfig {
        base_url: server.uri(),
        ..SessionConfig::default()
    }
}

pub fn memory_store() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::from_config(
        Box::new(MemoryBackend::new()),
        &SessionConfig::default(),
    ))
}

pub fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<CredentialStore> {
    let store = memory_store();
    if let Some(token) = access {
        store.set(CredentialKey::AccessToken, token, TtlClass::Short).unwrap();
    }
    if let Some(token) = refresh {
        store.set(CredentialKey::RefreshToken, token, TtlClass::Short).unwrap();
    }
    store
}

pub fn client(
    server: &MockServer,
    store: Arc<CredentialStore>,
    navigator: Arc<RecordingNavigator>,
) -> ApiClient {
    ApiClient::new(config(server), store, navigator).unwrap()
}
