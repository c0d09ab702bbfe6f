use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::{CredentialKey, CredentialStore, TtlClass};
use crate::api::types::{CurrentUser, LoginRequest, RefreshRequest, TokenPair};
use crate::api::{ApiClient, ApiError};

/// Login, logout and session checks on top of the [`ApiClient`].
#[derive(Clone)]
pub struct Session {
    api: ApiClient,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &CredentialStore {
        self.api.store()
    }

    /// Exchange username and password for a token pair.
    ///
    /// `remember` keeps the credentials for the extended lifetime; it is also
    /// inherited by every token the refresh protocol writes later.
    pub async fn login(&self, username: &str, password: &str, remember: bool) -> Result<(), ApiError> {
        let path = &self.api.config().login_path;
        let response = self
            .api
            .post_unauthenticated(path, &LoginRequest { username, password })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(username, status = status.as_u16(), "Login rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                    ApiError::LoginRejected("invalid username or password".to_string())
                }
                _ => ApiError::from_status(status, &body),
            });
        }

        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

        let ttl = if remember { TtlClass::Extended } else { TtlClass::Short };
        let store = self.store();
        store.clear();
        store
            .set(CredentialKey::RefreshToken, &tokens.refresh, ttl)
            .and_then(|()| store.set(CredentialKey::AccessToken, &tokens.access, ttl))
            .map_err(|e| ApiError::LoginRejected(format!("credentials could not be stored: {}", e)))?;

        info!(username, remember, "Logged in");
        Ok(())
    }

    /// Blacklist the refresh token (best effort) and drop local credentials.
    pub async fn logout(&self) {
        if let Some(refresh) = self.store().get(CredentialKey::RefreshToken) {
            let path = &self.api.config().blacklist_path;
            match self
                .api
                .post_unauthenticated(path, &RefreshRequest { refresh: &refresh })
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!("Refresh token blacklisted");
                }
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "Token blacklist rejected, clearing locally");
                }
                Err(e) => {
                    warn!(error = %e, "Token blacklist failed, clearing locally");
                }
            }
        }
        self.store().clear();
        info!("Logged out");
    }

    /// Fetch the logged-in user.
    ///
    /// `Ok(None)` means there is no usable session: nothing stored, or the
    /// refresh protocol gave up.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError> {
        let path = &self.api.config().current_user_path;
        match self.api.get_json::<CurrentUser>(path).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_session_expired() => {
                debug!(error = %e, "No usable session");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// A refresh token is stored, so requests can be authenticated
    pub fn is_authenticated(&self) -> bool {
        self.store().get(CredentialKey::RefreshToken).is_some()
    }
}
