//! `Authorization` header parsing.

use thiserror::Error;

/// Why an `Authorization` header could not be read as `Bearer <token>`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHeader {
    #[error("authorization header must start with Bearer")]
    Scheme,

    #[error("token not found")]
    MissingToken,

    #[error("authorization header must be Bearer token")]
    ExtraParts,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("authorization header is expected")]
    MissingHeader,

    #[error(transparent)]
    MalformedHeader(#[from] MalformedHeader),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl TokenError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidToken(reason.into())
    }
}

/// Extract the token from a raw `Authorization` header value.
///
/// The scheme keyword is matched case-insensitively and exactly one token
/// must follow it.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
    let mut parts = header.unwrap_or_default().split_whitespace();

    let scheme = parts.next().ok_or(TokenError::MissingHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(MalformedHeader::Scheme.into());
    }

    let token = parts.next().ok_or(MalformedHeader::MissingToken)?;
    if parts.next().is_some() {
        return Err(MalformedHeader::ExtraParts.into());
    }

    Ok(token)
}
