//! REST API client module for FoodCam services.
//!
//! This module provides the `ApiClient` every application request goes
//! through. The backend uses JWT bearer authentication: a short-lived access
//! token plus a refresh token exchanged at `/api/token/refresh/`.

pub mod client;
pub mod decorator;
pub mod error;
pub mod refresh;
pub mod request;
pub mod types;

pub use client::ApiClient;
pub use decorator::decorate;
pub use error::ApiError;
pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome, RefreshState};
pub use request::{PendingRequest, RequestBody};
pub use types::CurrentUser;
