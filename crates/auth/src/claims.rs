use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Time-related claims checked after a token's signature has been verified.
///
/// All values are seconds since the Unix epoch, as encoded in JWTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeClaims {
    pub exp: i64,
    pub iat: i64,
    pub auth_time: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("invalid issued at time")]
    IssuedInFuture,

    #[error("invalid authentication time")]
    AuthenticatedInFuture,

    #[error("missing or non-numeric claim '{0}'")]
    Missing(&'static str),
}

impl TimeClaims {
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ClaimsError> {
        let read = |key: &'static str| {
            payload
                .get(key)
                .and_then(Value::as_i64)
                .ok_or(ClaimsError::Missing(key))
        };

        Ok(Self {
            exp: read("exp")?,
            iat: read("iat")?,
            auth_time: read("auth_time")?,
        })
    }
}

/// Deterministically validate the time window of a verified token.
///
/// Signature verification / key lookup is intentionally outside this crate.
pub fn validate_claims(claims: &TimeClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    let now = now.timestamp();
    if claims.exp < now {
        return Err(ClaimsError::Expired);
    }
    if claims.iat > now {
        return Err(ClaimsError::IssuedInFuture);
    }
    if claims.auth_time > now {
        return Err(ClaimsError::AuthenticatedInFuture);
    }
    Ok(())
}
