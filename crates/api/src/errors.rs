//! Single dispatcher from failures to responses.
//!
//! Handlers return [`ApiResult`]; business errors, upstream service errors
//! and anything unexpected all go through one exhaustive match.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use restkit_auth::AccessDenied;
use restkit_core::{BusinessError, PaginationError};
use restkit_http::{HttpError, ServiceError, ServiceErrorKind};

use crate::responses;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Http(err.into())
    }
}

impl From<AccessDenied> for ApiError {
    fn from(_: AccessDenied) -> Self {
        Self::Business(BusinessError::PermissionDenied)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Business(e) => match e {
                BusinessError::PermissionDenied => StatusCode::FORBIDDEN,
                BusinessError::ResourceNotFound => StatusCode::NOT_FOUND,
                BusinessError::Validation(_) => StatusCode::BAD_REQUEST,
                BusinessError::Conflict(_) => StatusCode::CONFLICT,
                BusinessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Http(HttpError::Service(e)) => match e.kind {
                ServiceErrorKind::InvalidData => StatusCode::BAD_REQUEST,
                ServiceErrorKind::Authentication => StatusCode::UNAUTHORIZED,
                ServiceErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
                ServiceErrorKind::Authorization => StatusCode::FORBIDDEN,
                ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
                ServiceErrorKind::Conflict => StatusCode::CONFLICT,
                ServiceErrorKind::InternalServer | ServiceErrorKind::Unexpected => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Pagination(_) => StatusCode::BAD_REQUEST,
            Self::Http(_) | Self::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Business(e) => business_response(e),
            Self::Http(HttpError::Service(e)) => service_response(e),
            Self::Http(e) => responses::internal_server_error(&e),
            Self::Pagination(e) => responses::bad_request(e.to_string()),
            Self::Unhandled(e) => responses::internal_server_error(&format!("{e:#}")),
        }
    }
}

fn business_response(err: BusinessError) -> Response {
    match err {
        BusinessError::PermissionDenied => responses::forbidden(None),
        BusinessError::ResourceNotFound => responses::not_found(None),
        BusinessError::Validation(fields) => responses::bad_request(fields),
        BusinessError::Conflict(msg) => responses::conflict(Some(msg.as_str())),
        BusinessError::Internal(msg) => responses::internal_server_error(&msg),
    }
}

fn service_response(err: ServiceError) -> Response {
    match err.kind {
        ServiceErrorKind::InvalidData => responses::bad_request(err.reason().unwrap_or(Value::Null)),
        ServiceErrorKind::Authentication => responses::unauthorized(None),
        ServiceErrorKind::PaymentRequired => {
            let mut body = err.json_body();
            let code = body.remove("code").unwrap_or(Value::Null);
            let reason = body.remove("reason").unwrap_or(Value::Null);
            responses::payment_required(code, reason)
        }
        ServiceErrorKind::Authorization => responses::forbidden(None),
        ServiceErrorKind::NotFound => responses::not_found(None),
        ServiceErrorKind::Conflict => responses::conflict(None),
        ServiceErrorKind::InternalServer | ServiceErrorKind::Unexpected => responses::internal_server_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use restkit_http::TransportError;
    use serde_json::json;

    use super::*;
    use crate::responses::GENERIC_ERROR;
    use crate::responses::tests::body_json;

    async fn render(err: impl Into<ApiError>) -> (StatusCode, Value) {
        let err = err.into();
        let expected = err.status();
        let response = err.into_response();
        assert_eq!(response.status(), expected);
        (response.status(), body_json(response).await)
    }

    #[tokio::test]
    async fn business_errors() {
        assert_eq!(
            render(BusinessError::PermissionDenied).await,
            (StatusCode::FORBIDDEN, json!({"error": "Permission denied"}))
        );
        assert_eq!(
            render(BusinessError::ResourceNotFound).await,
            (StatusCode::NOT_FOUND, json!({"error": "Resource not found"}))
        );
        assert_eq!(
            render(BusinessError::field("email", "invalid")).await,
            (
                StatusCode::BAD_REQUEST,
                json!({"code": "validation_error", "reason": {"email": "invalid"}})
            )
        );
        assert_eq!(
            render(BusinessError::conflict("duplicate name")).await,
            (StatusCode::CONFLICT, json!({"error": "duplicate name"}))
        );
        assert_eq!(
            render(BusinessError::internal("disk on fire")).await,
            (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": GENERIC_ERROR}))
        );
    }

    #[tokio::test]
    async fn upstream_invalid_data_forwards_reason() {
        let err = ServiceError::new(400, r#"{"code":"validation_error","reason":{"name":"required"}}"#);
        assert_eq!(
            render(err).await,
            (
                StatusCode::BAD_REQUEST,
                json!({"code": "validation_error", "reason": {"name": "required"}})
            )
        );
    }

    #[tokio::test]
    async fn upstream_payment_required_forwards_code_and_reason() {
        let err = ServiceError::new(402, r#"{"code":"no_credit","reason":"top up"}"#);
        assert_eq!(
            render(err).await,
            (StatusCode::PAYMENT_REQUIRED, json!({"code": "no_credit", "reason": "top up"}))
        );
    }

    #[tokio::test]
    async fn other_upstream_statuses() {
        let cases = [
            (401, StatusCode::UNAUTHORIZED),
            (403, StatusCode::FORBIDDEN),
            (404, StatusCode::NOT_FOUND),
            (409, StatusCode::CONFLICT),
            (500, StatusCode::INTERNAL_SERVER_ERROR),
            (418, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (upstream, expected) in cases {
            let (status, _) = render(ServiceError::new(upstream, "not json")).await;
            assert_eq!(status, expected, "upstream {upstream}");
        }
    }

    #[tokio::test]
    async fn non_service_failures_are_generic_500s() {
        let transport = HttpError::Transport(TransportError::new("connection refused"));
        assert_eq!(
            render(transport).await,
            (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": GENERIC_ERROR}))
        );
        assert_eq!(
            render(anyhow::anyhow!("unexpected")).await,
            (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": GENERIC_ERROR}))
        );
    }

    #[tokio::test]
    async fn access_denied_and_pagination() {
        let (status, _) = render(AccessDenied).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let err = restkit_core::Paginator::new(Some("abc"), None).unwrap_err();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }
}
