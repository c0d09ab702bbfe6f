//! Access token refresh protocol.
//!
//! At most one exchange with the refresh endpoint is in flight at a time.
//! Every caller that hits an expired token while an exchange is running joins
//! it and receives the same [`RefreshOutcome`]. A failed exchange ends the
//! session exactly once: both tokens are cleared and the navigator is sent to
//! the login route.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{RefreshRequest, RefreshResponse};
use crate::auth::{redirect_to, CredentialKey, CredentialStore, SessionNavigator};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh endpoint returned {0}")]
    Rejected(StatusCode),

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success(String),
    Failure(RefreshFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type SharedExchange = Shared<BoxFuture<'static, RefreshOutcome>>;

struct Exchange {
    http: Client,
    refresh_url: Url,
    store: Arc<CredentialStore>,
    navigator: Arc<dyn SessionNavigator>,
    login_route: String,
}

pub struct RefreshCoordinator {
    exchange: Arc<Exchange>,
    in_flight: Mutex<Option<SharedExchange>>,
}

impl RefreshCoordinator {
    pub fn new(
        http: Client,
        refresh_url: Url,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn SessionNavigator>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            exchange: Arc::new(Exchange {
                http,
                refresh_url,
                store,
                navigator,
                login_route: login_route.into(),
            }),
            in_flight: Mutex::new(None),
        }
    }

    pub fn refresh_url(&self) -> &Url {
        &self.exchange.refresh_url
    }

    pub fn state(&self) -> RefreshState {
        if self.slot().is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Obtain a new access token, joining an exchange already in flight
    pub async fn refresh(&self) -> RefreshOutcome {
        let exchange = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(running) => {
                    debug!("Joining in-flight token refresh");
                    running.clone()
                }
                None => {
                    let started = Arc::clone(&self.exchange).run().boxed().shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let outcome = exchange.clone().await;

        let mut slot = self.slot();
        if slot
            .as_ref()
            .is_some_and(|running| Shared::ptr_eq(running, &exchange))
        {
            *slot = None;
        }
        outcome
    }

    fn slot(&self) -> MutexGuard<'_, Option<SharedExchange>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Exchange {
    async fn run(self: Arc<Self>) -> RefreshOutcome {
        let outcome = match self.store.get(CredentialKey::RefreshToken) {
            Some(refresh_token) => self.request_access_token(&refresh_token).await,
            None => RefreshOutcome::Failure(RefreshFailure::NoRefreshToken),
        };

        match outcome {
            RefreshOutcome::Success(_) => info!("Access token refreshed"),
            RefreshOutcome::Failure(ref reason) => {
                warn!(%reason, "Token refresh failed, ending session");
                self.store.clear();
                redirect_to(self.navigator.as_ref(), &self.login_route);
            }
        }
        outcome
    }

    async fn request_access_token(&self, refresh_token: &str) -> RefreshOutcome {
        let response = match self
            .http
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RefreshOutcome::Failure(RefreshFailure::Network(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return RefreshOutcome::Failure(RefreshFailure::Rejected(status));
        }

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return RefreshOutcome::Failure(RefreshFailure::InvalidResponse(e.to_string()))
            }
        };

        // Writes that fail are already logged; the token in hand still serves the replay
        let ttl = self.store.session_ttl();
        if let Some(ref rotated) = body.refresh {
            let _ = self.store.set(CredentialKey::RefreshToken, rotated, ttl);
        }
        let _ = self.store.set(CredentialKey::AccessToken, &body.access, ttl);

        RefreshOutcome::Success(body.access)
    }
}
