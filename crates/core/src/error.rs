//! Business error model.

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type used by application logic built on restkit.
pub type BusinessResult<T> = Result<T, BusinessError>;

/// Field name → human readable validation message.
pub type FieldErrors = BTreeMap<String, String>;

/// Domain-level failure raised by application logic.
///
/// This family is never conflated with upstream service errors; the API layer
/// maps both to protocol responses through a single exhaustive dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusinessError {
    /// The caller has no access to the resource.
    #[error("permission denied")]
    PermissionDenied,

    /// The requested resource does not exist.
    #[error("resource not found")]
    ResourceNotFound,

    /// One or more fields failed validation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    /// The operation conflicts with the current state of the resource.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Something unexpected happened; the message is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BusinessError {
    pub fn validation<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Validation(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation([(field.into(), message.into())])
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::ResourceNotFound
    }

    pub fn permission_denied() -> Self {
        Self::PermissionDenied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_collects_fields() {
        let err = BusinessError::validation([("email", "invalid"), ("name", "required")]);

        let BusinessError::Validation(fields) = &err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("email").map(String::as_str), Some("invalid"));
        assert_eq!(fields.get("name").map(String::as_str), Some("required"));
        assert_eq!(err.to_string(), "validation failed on 2 field(s)");
    }

    #[test]
    fn single_field_helper() {
        assert_eq!(
            BusinessError::field("age", "too low"),
            BusinessError::validation([("age", "too low")])
        );
    }
}
