use serde_json::{Map, Value};
use thiserror::Error;

use crate::transport::TransportError;

/// Upstream failure kind, keyed by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    InvalidData,
    Authentication,
    PaymentRequired,
    Authorization,
    NotFound,
    Conflict,
    InternalServer,
    Unexpected,
}

impl ServiceErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidData,
            401 => Self::Authentication,
            402 => Self::PaymentRequired,
            403 => Self::Authorization,
            404 => Self::NotFound,
            409 => Self::Conflict,
            500 => Self::InternalServer,
            _ => Self::Unexpected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidData => "invalid data",
            Self::Authentication => "authentication",
            Self::PaymentRequired => "payment required",
            Self::Authorization => "authorization",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::InternalServer => "internal server",
            Self::Unexpected => "unexpected",
        }
    }
}

/// A non-success response from a peer service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error from upstream (status {status})", .kind.as_str())]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub status: u16,
    pub body: String,
}

impl ServiceError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::from_status(status),
            status,
            body: body.into(),
        }
    }

    /// The body decoded as a JSON object; an empty map when it is not one.
    pub fn json_body(&self) -> Map<String, Value> {
        match serde_json::from_str(&self.body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// `reason` field of a `{"code", "reason"}` error body.
    pub fn reason(&self) -> Option<Value> {
        self.json_body().remove("reason")
    }

    /// `code` field of a `{"code", "reason"}` error body.
    pub fn code(&self) -> Option<String> {
        match self.json_body().remove("code") {
            Some(Value::String(code)) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A caller-supplied status handler rejected the response.
    #[error("status {status} rejected: {cause:#}")]
    Rejected { status: u16, cause: anyhow::Error },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not decode response body (status {status}): {cause}")]
    Decode { status: u16, cause: serde_json::Error },

    #[error("could not encode request body: {0}")]
    Encode(serde_json::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service(e) => Some(e.status),
            Self::Rejected { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::Transport(_) | Self::Encode(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}
