//! Outbound request descriptions.
//!
//! A [`PendingRequest`] is a plain value: the client decorates a copy for
//! each dispatch, so the same request can be replayed after a refresh.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;

use super::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Raw payload; the caller sets its content type
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<RequestBody>,
    retried: bool,
}

impl PendingRequest {
    /// `url` is either a path relative to the configured base URL or absolute
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode JSON body: {}", e)))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Attach a raw body, overriding the default JSON content type
    pub fn with_bytes(mut self, body: Vec<u8>, content_type: &str) -> Result<Self, ApiError> {
        let value = HeaderValue::from_str(content_type)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid content type: {}", e)))?;
        self.headers.insert(CONTENT_TYPE, value);
        self.body = Some(RequestBody::Bytes(body));
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub(crate) fn with_headers(&self, headers: HeaderMap) -> Self {
        Self {
            headers,
            ..self.clone()
        }
    }

    /// Copy of this request flagged as the one permitted replay
    pub fn mark_retried(&self) -> Self {
        Self {
            retried: true,
            ..self.clone()
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn retried(&self) -> bool {
        self.retried
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mark_retried_is_copy_on_write() {
        let original = PendingRequest::get("/api/nutrition/goals/");
        let retry = original.mark_retried();

        assert!(!original.retried());
        assert!(retry.retried());
        assert_eq!(retry.url(), original.url());
    }

    #[test]
    fn test_with_json_body() {
        let request = PendingRequest::post("/api/nutrition/weight-records/")
            .with_json(&json!({"weight": 72.5}))
            .unwrap();
        assert_eq!(request.body(), Some(&RequestBody::Json(json!({"weight": 72.5}))));
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_with_bytes_sets_content_type() {
        let request = PendingRequest::post("/classify/")
            .with_bytes(vec![1, 2, 3], "image/jpeg")
            .unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "image/jpeg");

        assert!(PendingRequest::post("/classify/")
            .with_bytes(vec![], "bad\nvalue")
            .is_err());
    }
}
