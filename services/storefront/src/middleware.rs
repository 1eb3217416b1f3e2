//! Session loading and route guard middleware

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    error::ShopError,
    guards::{RouteGuard, authorize},
    session::Session,
    state::AppState,
};

/// The session attached to the current request, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token into a fresh session
///
/// Runs on every route. An unknown or expired token simply leaves the request
/// without a session; the guards decide what that means.
pub async fn load_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ShopError> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let session = match token {
        Some(token) => state.sessions.refresh(&token).await?,
        None => None,
    };

    req.extensions_mut().insert(CurrentSession(session));
    Ok(next.run(req).await)
}

async fn enforce(guard: RouteGuard, req: Request<Body>, next: Next) -> Result<Response, ShopError> {
    let user = req
        .extensions()
        .get::<CurrentSession>()
        .and_then(|current| current.0.as_ref())
        .map(|session| &session.user);

    authorize(guard, user).into_result()?;
    Ok(next.run(req).await)
}

/// Login and registration: visitors without a session only
pub async fn public_only(req: Request<Body>, next: Next) -> Result<Response, ShopError> {
    enforce(RouteGuard::Public, req, next).await
}

pub async fn require_user(req: Request<Body>, next: Next) -> Result<Response, ShopError> {
    enforce(RouteGuard::Protected, req, next).await
}

pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ShopError> {
    enforce(RouteGuard::Admin, req, next).await
}

/// Handlers behind a guard take the session directly
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .and_then(|current| current.0.clone())
            .ok_or(ShopError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(bearer_token(&headers), Some("abc-123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
