//! Pre-flight request decoration.

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::request::PendingRequest;
use crate::auth::Credential;

/// Return a copy of `request` carrying the bearer token and a JSON content type.
///
/// No token means no `Authorization` header; public endpoints still work. A
/// content type the caller already set is kept. A token that cannot be
/// encoded as a header value is treated as absent.
pub fn decorate(request: &PendingRequest, credential: &Credential) -> PendingRequest {
    let mut headers = request.headers().clone();

    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    if let Some(ref token) = credential.access_token {
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }

    request.with_headers(headers)
}
