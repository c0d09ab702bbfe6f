//! API client for communicating with the FoodCam REST API.
//!
//! Every request the application makes goes through [`ApiClient::send`],
//! which attaches the current bearer token and recovers from an expired
//! access token by refreshing it and replaying the request once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::decorator::decorate;
use super::refresh::{RefreshCoordinator, RefreshOutcome};
use super::request::{PendingRequest, RequestBody};
use super::ApiError;
use crate::auth::{Credential, CredentialKey, CredentialStore, SessionNavigator};
use crate::config::SessionConfig;

/// API client for FoodCam.
/// Clone is cheap - the connection pool, store and refresh slot are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Arc<SessionConfig>,
    store: Arc<CredentialStore>,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        config: SessionConfig,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn SessionNavigator>,
    ) -> Result<Self, ApiError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let refresh_url = resolve(&config.base_url, &config.refresh_path)?;
        let refresh = RefreshCoordinator::new(
            client.clone(),
            refresh_url,
            Arc::clone(&store),
            navigator,
            config.login_route.clone(),
        );

        Ok(Self {
            client,
            config: Arc::new(config),
            store,
            refresh: Arc::new(refresh),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Resolve a path against the configured base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        resolve(&self.config.base_url, path)
    }

    /// Send a request through the auth pipeline.
    ///
    /// Non-2xx statuses become errors. A 401 (or 403, when configured) on a
    /// request that has not been replayed yet triggers one refresh and one
    /// replay; anything else is returned as-is.
    pub async fn send(&self, request: PendingRequest) -> Result<Response, ApiError> {
        let url = self.endpoint(request.url())?;
        let credential = self.store.snapshot();

        let response = self.dispatch(&url, &request, &credential).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let refreshable = self.config.is_refresh_trigger(status)
            && !request.retried()
            && url != *self.refresh.refresh_url();
        if !refreshable {
            warn!(url = %url, status = status.as_u16(), retried = request.retried(), "Request failed");
            return Err(self.failure(request.retried(), response).await);
        }

        debug!(url = %url, status = status.as_u16(), "Access token rejected, refreshing");
        let original = self.failure(false, response).await;

        let token = match self.replacement_token(&credential) {
            Some(token) => token,
            None => match self.refresh.refresh().await {
                RefreshOutcome::Success(token) => token,
                RefreshOutcome::Failure(reason) => {
                    warn!(url = %url, %reason, "Request failed, session could not be refreshed");
                    return Err(ApiError::RefreshRejected {
                        reason,
                        source: Box::new(original),
                    });
                }
            },
        };

        let retry = request.mark_retried();
        let credential = Credential {
            access_token: Some(token),
            refresh_token: self.store.get(CredentialKey::RefreshToken),
        };
        let response = self.dispatch(&url, &retry, &credential).await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            warn!(url = %url, status = status.as_u16(), "Replayed request failed");
            Err(self.failure(true, response).await)
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(PendingRequest::get(path)).await?;
        Self::parse_json(path, response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(PendingRequest::post(path).with_json(body)?).await?;
        Self::parse_json(path, response).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(PendingRequest::put(path).with_json(body)?).await?;
        Self::parse_json(path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(PendingRequest::delete(path)).await?;
        Ok(())
    }

    /// POST without bearer token or refresh handling.
    /// Used for the token endpoints themselves.
    pub(crate) async fn post_unauthenticated<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await.inspect_err(|e| {
            warn!(path, error = %e, "Token endpoint unreachable");
        })?;
        Ok(response)
    }

    /// The store already holds a different access token than the one that
    /// was rejected: another request refreshed in the meantime.
    fn replacement_token(&self, sent: &Credential) -> Option<String> {
        let current = self.store.get(CredentialKey::AccessToken)?;
        if sent.access_token.as_deref() == Some(current.as_str()) {
            None
        } else {
            debug!("Access token already replaced, replaying without refresh");
            Some(current)
        }
    }

    async fn dispatch(
        &self,
        url: &Url,
        request: &PendingRequest,
        credential: &Credential,
    ) -> Result<Response, ApiError> {
        let decorated = decorate(request, credential);

        let mut builder = self
            .client
            .request(decorated.method().clone(), url.clone())
            .headers(decorated.headers().clone());
        builder = match decorated.body() {
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        };

        debug!(
            method = %decorated.method(),
            url = %url,
            retried = decorated.retried(),
            "Dispatching request"
        );
        builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed before a response arrived");
            ApiError::NetworkError(e)
        })
    }

    async fn failure(&self, retried: bool, response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if retried && self.config.is_refresh_trigger(status) {
            ApiError::RetryExhausted(status)
        } else {
            ApiError::from_status(status, &body)
        }
    }

    async fn parse_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }
}

fn resolve(base_url: &str, path: &str) -> Result<Url, ApiError> {
    let raw = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    };
    Url::parse(&raw).map_err(|e| ApiError::InvalidRequest(format!("Invalid URL {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let url = resolve("http://localhost:8000/", "/api/token/refresh/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/token/refresh/");

        let url = resolve("http://localhost:8000", "https://cdn.foodcam.example/a.png").unwrap();
        assert_eq!(url.host_str(), Some("cdn.foodcam.example"));

        assert!(resolve("not a base", "/x").is_err());
    }
}
