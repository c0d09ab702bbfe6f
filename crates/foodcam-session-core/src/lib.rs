//! Client-side session layer for FoodCam.
//!
//! Attaches bearer credentials to outgoing requests and recovers from an
//! expired access token without the caller noticing. See [`api::ApiClient`]
//! for the request pipeline and [`auth::CredentialStore`] for storage.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{ApiClient, ApiError, PendingRequest};
pub use auth::{CredentialStore, Session, SessionNavigator};
pub use config::SessionConfig;
