//! `restkit-auth` — bearer token parsing, caller identity and role checks.
//!
//! This crate is intentionally decoupled from HTTP frameworks. Signature
//! verification is not performed here: tokens are assumed to have been
//! verified upstream (see `restkit-api`'s JWT middleware).

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod key_cache;
pub mod roles;
pub mod scope;
pub mod token;

pub use authorize::{AccessDenied, RoleGuard, authorize};
pub use claims::{ClaimsError, TimeClaims, validate_claims};
pub use identity::{Identity, token_key_id};
pub use key_cache::KeyCache;
pub use roles::{Role, RoleRank, highest_role};
pub use scope::{DEFAULT_LOCALE, RequestScope, TraceContext, parse_trace_header};
pub use token::{MalformedHeader, TokenError, extract_bearer_token};
