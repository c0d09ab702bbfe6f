//! Request and response bodies of the token and account endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body for both the refresh and blacklist endpoints
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    /// Present when the server rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_response_with_rotation() {
        let plain: RefreshResponse = serde_json::from_str(r#"{"access": "A1"}"#).unwrap();
        assert_eq!(plain.access, "A1");
        assert!(plain.refresh.is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"access": "A2", "refresh": "R1"}"#).unwrap();
        assert_eq!(rotated.refresh.as_deref(), Some("R1"));
    }

    #[test]
    fn test_parse_current_user() {
        let user: CurrentUser =
            serde_json::from_str(r#"{"id": 7, "username": "mei", "email": "mei@foodcam.example"}"#)
                .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.email.as_deref(), Some("mei@foodcam.example"));
    }
}
