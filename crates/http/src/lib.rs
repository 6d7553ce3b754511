//! `restkit-http` — outbound calls to peer services.
//!
//! `HttpHandler` propagates the caller's identity headers, maps upstream
//! failures onto a fixed [`ServiceErrorKind`] taxonomy and retries a bounded
//! number of times on a configurable set of statuses.

pub mod audit;
pub mod client;
pub mod error;
pub mod retry;
pub mod transport;

pub use audit::{LogMeRequestLogger, RequestLogger, RequestRecord, TracingRequestLogger, redact_authorization};
pub use client::{HttpHandler, HttpHandlerBuilder, RequestOptions, StatusHandler};
pub use error::{HttpError, ServiceError, ServiceErrorKind};
pub use retry::RetryBudget;
pub use transport::{OutboundRequest, ReqwestTransport, Transport, TransportError, UpstreamResponse};
