use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use std::ops::Deref;

use restkit_auth::{RequestScope, TokenError, parse_trace_header};

/// Header carrying the JSON trace context propagated between services.
pub const TRACE_HEADER: &str = "trace_header";

/// The caller's [`RequestScope`], extracted from request headers.
///
/// Rejects with a bare 401 when the bearer token is missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext(pub RequestScope);

impl RequestContext {
    pub fn into_inner(self) -> RequestScope {
        self.0
    }
}

impl Deref for RequestContext {
    type Target = RequestScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        scope_from_headers(&parts.headers).map(Self).map_err(|e| {
            tracing::debug!(error = %e, "request scope rejected");
            StatusCode::UNAUTHORIZED
        })
    }
}

/// Build a [`RequestScope`] from `Authorization`, `Accept-Language` and the
/// trace header.
pub fn scope_from_headers(headers: &HeaderMap) -> Result<RequestScope, TokenError> {
    let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    RequestScope::new(
        text(header::AUTHORIZATION.as_str()),
        text(header::ACCEPT_LANGUAGE.as_str()),
        parse_trace_header(text(TRACE_HEADER)),
    )
}
