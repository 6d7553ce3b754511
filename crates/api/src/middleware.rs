//! JWT admission middleware.
//!
//! Signature checks belong to a [`TokenValidator`] implementation. The
//! bundled [`ClaimsValidator`] only checks the time claims of an already
//! trusted token.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use restkit_auth::{Identity, TimeClaims, validate_claims};

#[derive(Debug, Error)]
#[error("invalid token: {reason}")]
pub struct InvalidToken {
    pub reason: String,
}

impl InvalidToken {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<(), InvalidToken>;
}

/// Accepts any well-formed token whose `exp`, `iat` and `auth_time` are
/// consistent with the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsValidator;

#[async_trait]
impl TokenValidator for ClaimsValidator {
    async fn validate(&self, token: &str) -> Result<(), InvalidToken> {
        let identity = Identity::decode(token).map_err(|e| InvalidToken::new(e.to_string()))?;
        let claims = TimeClaims::from_payload(identity.payload()).map_err(|e| InvalidToken::new(e.to_string()))?;
        validate_claims(&claims, Utc::now()).map_err(|e| InvalidToken::new(e.to_string()))
    }
}

#[derive(Clone)]
pub struct JwtState {
    validator: Arc<dyn TokenValidator>,
    excludes: Arc<HashSet<String>>,
}

impl JwtState {
    pub fn new<V, I, P>(validator: V, excludes: I) -> Self
    where
        V: TokenValidator + 'static,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            validator: Arc::new(validator),
            excludes: Arc::new(excludes.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excludes.contains(path)
    }
}

pub async fn jwt_middleware(State(state): State<JwtState>, req: Request, next: Next) -> Response {
    if state.is_excluded(req.uri().path()) {
        return next.run(req).await;
    }

    let Some(authorization) = req.headers().get(header::AUTHORIZATION) else {
        return unauthorized("Missing JWT token");
    };

    // The token is the last whitespace-separated part of the header.
    let token = authorization
        .to_str()
        .ok()
        .and_then(|value| value.split_whitespace().last());

    let Some(token) = token else {
        return unauthorized("Invalid JWT token");
    };

    if let Err(e) = state.validator.validate(token).await {
        tracing::info!(path = %req.uri().path(), error = %e, "jwt rejected");
        return unauthorized("Invalid JWT token");
    }

    next.run(req).await
}

/// Require a valid JWT on every route of `router` except `excludes`.
pub fn with_jwt_auth<S>(router: Router<S>, state: JwtState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, jwt_middleware))
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}
