//! Custom error types for the storefront service

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Notice shown to blocked users on every protected route
pub const BLOCKED_NOTICE: &str = "Your account has been blocked. Please contact support.";

/// Custom error type for the storefront service
#[derive(Error, Debug)]
pub enum ShopError {
    /// Input rejected before anything was sent to the record store
    #[error("{0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Login refused for a blocked account
    #[error("User is blocked")]
    UserBlocked,

    /// Route guard: a live session whose account has since been blocked
    #[error("{}", BLOCKED_NOTICE)]
    AccountBlocked,

    #[error("User already exists")]
    UserExists,

    /// No session, or the session expired
    #[error("Unauthorized")]
    Unauthorized,

    /// Route guard: the session lacks the role required
    #[error("Not authorized")]
    NotAuthorized,

    /// Route guard: public-only route visited with a live session
    #[error("Already signed in")]
    AlreadyAuthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0} is out of stock")]
    OutOfStock(String),

    /// Destructive admin action sent without `confirm=true`
    #[error("Confirmation required for this action")]
    ConfirmationRequired,

    /// The record kept changing underneath us
    #[error("Record was modified concurrently, please retry")]
    Conflict,

    #[error("Record store error: {0}")]
    Store(#[source] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                ShopError::NotFound(format!("{}/{}", collection, id))
            }
            StoreError::Conflict { .. } => ShopError::Conflict,
            other => ShopError::Store(other),
        }
    }
}

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            ShopError::Validation(_)
            | ShopError::EmptyCart
            | ShopError::ConfirmationRequired => StatusCode::BAD_REQUEST,
            ShopError::InvalidCredentials | ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
            ShopError::UserBlocked | ShopError::AccountBlocked | ShopError::NotAuthorized => {
                StatusCode::FORBIDDEN
            }
            ShopError::UserNotFound | ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::UserExists | ShopError::OutOfStock(_) | ShopError::Conflict => {
                StatusCode::CONFLICT
            }
            ShopError::AlreadyAuthenticated => StatusCode::SEE_OTHER,
            ShopError::Store(_) => StatusCode::BAD_GATEWAY,
            ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ShopError::Store(e) => {
                error!("Record store failure: {}", e);
                "Record store unavailable".to_string()
            }
            ShopError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
        }));

        match self {
            ShopError::AlreadyAuthenticated => {
                (status, [(header::LOCATION, "/")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

/// Type alias for storefront results
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_domain_errors() {
        let not_found: ShopError = StoreError::not_found("products", "9").into();
        assert!(matches!(not_found, ShopError::NotFound(ref what) if what == "products/9"));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: ShopError = StoreError::Conflict {
            collection: "users".to_string(),
            id: "1".to_string(),
            expected: 1,
            found: 2,
        }
        .into();
        assert!(matches!(conflict, ShopError::Conflict));

        let upstream: ShopError = StoreError::Status {
            method: "GET",
            path: "/users".to_string(),
            status: 500,
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_guard_errors_and_redirects() {
        let response = ShopError::AlreadyAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        assert_eq!(ShopError::UserBlocked.status(), StatusCode::FORBIDDEN);
        assert_eq!(ShopError::AccountBlocked.status(), StatusCode::FORBIDDEN);
        assert_eq!(ShopError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ShopError::NotAuthorized.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_blocked_messages_differ_between_login_and_guard() {
        assert_eq!(ShopError::UserBlocked.to_string(), "User is blocked");
        assert_eq!(ShopError::AccountBlocked.to_string(), BLOCKED_NOTICE);
    }
}
