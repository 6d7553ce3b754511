//! Minimum-role authorization.
//!
//! Every failure (no header, malformed header, undecodable token, rank too
//! low) collapses into the same [`AccessDenied`] so callers cannot tell
//! which check failed. The concrete reason is only logged at debug level.

use thiserror::Error;

use crate::identity::Identity;
use crate::roles::RoleRank;

/// Opaque authorization failure; maps to a 403 at the protocol boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("forbidden")]
pub struct AccessDenied;

/// Decode the caller from `authorization` and require at least `min_role`.
///
/// - No IO
/// - No panics
pub fn authorize(authorization: Option<&str>, min_role: RoleRank) -> Result<Identity, AccessDenied> {
    let identity = Identity::from_authorization(authorization).map_err(|e| {
        tracing::debug!(error = %e, "authorization rejected: unreadable credentials");
        AccessDenied
    })?;

    let rank = identity.highest_role();
    if rank < min_role {
        tracing::debug!(
            user_id = identity.user_id().unwrap_or_default(),
            rank = rank.value(),
            required = min_role.value(),
            "authorization rejected: insufficient role"
        );
        return Err(AccessDenied);
    }

    Ok(identity)
}

/// Reusable minimum-role guard around a handler.
///
/// The guard does not care how the handler runs: a plain closure returns its
/// value directly, an `async` closure returns its future for the caller to
/// await. Either way the handler is invoked only after the check passes.
///
/// ```ignore
/// let guard = RoleGuard::new(RoleRank::Admin);
/// let listed = guard.call(header, |identity| list_shops(&identity))?;
/// let created = guard.call(header, |identity| async move { create(identity).await })?.await;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGuard {
    min_role: RoleRank,
}

impl RoleGuard {
    pub fn new(min_role: RoleRank) -> Self {
        Self { min_role }
    }

    pub fn min_role(&self) -> RoleRank {
        self.min_role
    }

    pub fn check(&self, authorization: Option<&str>) -> Result<Identity, AccessDenied> {
        authorize(authorization, self.min_role)
    }

    pub fn call<F, R>(&self, authorization: Option<&str>, handler: F) -> Result<R, AccessDenied>
    where
        F: FnOnce(Identity) -> R,
    {
        self.check(authorization).map(handler)
    }
}
