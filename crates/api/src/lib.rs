//! `restkit-api` — axum glue for services built on restkit.
//!
//! - [`RequestContext`] extracts the caller's [`RequestScope`](restkit_auth::RequestScope)
//! - [`require_role`] guards routes by minimum role
//! - [`jwt_middleware`] rejects requests without a valid token
//! - [`KeySetValidator`] admits tokens signed with a published, cached key
//! - [`ApiError`] maps business and upstream failures to responses

pub mod authz;
pub mod context;
pub mod errors;
pub mod jwks;
pub mod middleware;
pub mod responses;
pub mod routes;

pub use authz::{guarded, require_role};
pub use context::{RequestContext, TRACE_HEADER, scope_from_headers};
pub use errors::{ApiError, ApiResult};
pub use jwks::{KeySet, KeySetValidator, KeySource};
pub use middleware::{ClaimsValidator, InvalidToken, JwtState, TokenValidator, jwt_middleware, with_jwt_auth};
pub use routes::{health, health_routes};
