//! Route-level role guard.
//!
//! The guard runs before the handler. On success the caller's [`Identity`] is
//! stored in the request extensions; on any failure (missing token, malformed
//! token, insufficient role) the response is a bare 403 so callers can't tell
//! the cases apart.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;

use restkit_auth::{Identity, RoleGuard, RoleRank};

pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity: Identity = guard.check(authorization).map_err(|_| StatusCode::FORBIDDEN)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Wrap every route of `router` in a [`require_role`] guard.
pub fn guarded<S>(router: Router<S>, min_role: RoleRank) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(RoleGuard::new(min_role), require_role))
}
