use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::auth::{AuthError, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// The request's session, resolved from a `Bearer` token.
///
/// Never rejects: a missing or invalid token yields `Session(None)`, and the
/// service operation decides whether that is acceptable. The token only names
/// the account; role and active flag come from the stored row, so a deleted,
/// deactivated or demoted account loses its access immediately.
#[derive(Debug, Clone)]
pub struct Session(pub Option<Principal>);

impl Session {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer(&parts.headers) else {
            return Ok(Session(None));
        };

        let claimed = match state.tokens.validate(token) {
            Ok(principal) => principal,
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                return Ok(Session(None));
            }
        };

        match state.users().find(claimed.id).await {
            Ok(Some(user)) if user.is_active => Ok(Session(Some(user.principal()))),
            Ok(_) => {
                tracing::debug!("Ignoring session token for missing or inactive account {}", claimed.id);
                Ok(Session(None))
            }
            Err(e) => {
                tracing::warn!("Session lookup for {} failed: {}", claimed.id, e);
                Ok(Session(None))
            }
        }
    }
}

/// A session that must be present. Rejects with 401 before any path, query or
/// body extractor runs, so anonymous requests never reach input validation.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl Authenticated {
    /// Same shape as [`Session::principal`], for passing straight to services.
    pub fn principal(&self) -> Option<&Principal> {
        Some(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };
        session
            .0
            .map(Authenticated)
            .ok_or_else(|| ApiError::unauthorized(AuthError::MissingSession.to_string()))
    }
}

/// Extract JWT token from Authorization header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Best-effort client address: the first `X-Forwarded-For` hop, if any.
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }

    #[test]
    fn first_forwarded_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(forwarded_for(&headers).as_deref(), Some("203.0.113.7"));
    }
}
