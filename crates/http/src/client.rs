//! `HttpHandler`: outbound JSON calls to peer services.
//!
//! Every verb runs the same loop:
//!
//! 1. merge instance headers with per-call overrides (overrides win);
//! 2. send and audit the attempt;
//! 3. return the decoded body if the status is in the verb's success set;
//! 4. otherwise run the per-status handler, if any, on the first attempt only;
//! 5. retry while the status is retryable and budget remains, else fail with
//!    the matching [`ServiceError`].
//!
//! Transport failures are returned immediately and never retried.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use restkit_auth::{RequestScope, TraceContext};
use restkit_core::Settings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::audit::{RequestLogger, RequestRecord, TracingRequestLogger, redact_authorization};
use crate::error::{HttpError, ServiceError};
use crate::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_ON, RetryBudget};
use crate::transport::{OutboundRequest, ReqwestTransport, Transport, TransportError, UpstreamResponse};

/// Per-status hook run before the response is mapped to a [`ServiceError`].
///
/// Returning `Err` ends the call with [`HttpError::Rejected`].
pub type StatusHandler = Arc<dyn Fn(&UpstreamResponse) -> anyhow::Result<()> + Send + Sync>;

const POST_SUCCESS: &[u16] = &[200, 201];
const DEFAULT_SUCCESS: &[u16] = &[200];

/// Per-call overrides.
#[derive(Clone, Default)]
pub struct RequestOptions {
    headers: BTreeMap<String, String>,
    handlers: HashMap<u16, StatusHandler>,
    retry: Option<u32>,
    retry_on: Option<BTreeSet<u16>>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<&u16> = self.handlers.keys().collect();
        statuses.sort_unstable();
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("handlers", &statuses)
            .field("retry", &self.retry)
            .field("retry_on", &self.retry_on)
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn on_status<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&UpstreamResponse) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(status, Arc::new(handler));
        self
    }

    /// Retry budget for this call (default 3).
    pub fn retry(mut self, retries: u32) -> Self {
        self.retry = Some(retries);
        self
    }

    /// Retryable statuses for this call, replacing the instance set.
    /// An empty set leaves the instance set in force.
    pub fn retry_on(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = Some(statuses.into_iter().collect());
        self
    }
}

/// Outbound HTTP client bound to one inbound request's scope.
///
/// Configuration is fixed at build time; the handler itself is immutable and
/// cheap to share.
#[derive(Clone)]
pub struct HttpHandler {
    transport: Arc<dyn Transport>,
    logger: Arc<dyn RequestLogger>,
    headers: BTreeMap<String, String>,
    trace: TraceContext,
    origin_service: String,
    retry_on: BTreeSet<u16>,
    max_retries: u32,
    log_requests: bool,
}

impl fmt::Debug for HttpHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHandler")
            .field("header_names", &self.headers.keys().collect::<Vec<_>>())
            .field("origin_service", &self.origin_service)
            .field("retry_on", &self.retry_on)
            .field("max_retries", &self.max_retries)
            .field("log_requests", &self.log_requests)
            .finish_non_exhaustive()
    }
}

impl HttpHandler {
    pub fn builder() -> HttpHandlerBuilder {
        HttpHandlerBuilder::default()
    }

    /// Instance headers after identity propagation and overrides.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn retry_on(&self) -> &BTreeSet<u16> {
        &self.retry_on
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, HttpError> {
        self.execute(Method::GET, url, None, DEFAULT_SUCCESS, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, HttpError> {
        self.execute(Method::DELETE, url, None, DEFAULT_SUCCESS, options).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.execute(Method::POST, url, Some(body), POST_SUCCESS, options).await
    }

    pub async fn put<B, T>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.execute(Method::PUT, url, Some(body), DEFAULT_SUCCESS, options).await
    }

    pub async fn patch<B, T>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.execute(Method::PATCH, url, Some(body), DEFAULT_SUCCESS, options).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        success: &[u16],
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let RequestOptions {
            headers: overrides,
            mut handlers,
            retry,
            retry_on,
        } = options;

        let mut headers = self.headers.clone();
        headers.extend(overrides);

        let mut budget = RetryBudget::new(
            retry_on.filter(|statuses| !statuses.is_empty()).unwrap_or_else(|| self.retry_on.clone()),
            retry.unwrap_or(self.max_retries),
        );

        let request = OutboundRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        };

        loop {
            let outcome = self.transport.send(request.clone()).await;
            self.audit(&request, outcome.as_ref().ok());

            let response = outcome.inspect_err(|e| {
                tracing::error!(method = %request.method, url, error = %e, "outbound request failed");
            })?;

            if success.contains(&response.status) {
                return decode(response);
            }

            if let Some(handler) = handlers.get(&response.status) {
                handler(&response).map_err(|cause| HttpError::Rejected {
                    status: response.status,
                    cause,
                })?;
            }

            let error = ServiceError::new(response.status, response.body);

            if budget.allows(error.status) {
                // Only the first attempt consults the per-status handlers.
                handlers.clear();
                tracing::warn!(
                    method = %request.method,
                    url,
                    status = error.status,
                    remaining = budget.remaining(),
                    "retrying outbound request"
                );
                continue;
            }

            tracing::error!(method = %request.method, url, status = error.status, "unexpected upstream status");
            return Err(error.into());
        }
    }

    fn audit(&self, request: &OutboundRequest, response: Option<&UpstreamResponse>) {
        if !self.log_requests {
            return;
        }

        let mut record = RequestRecord::new(&self.origin_service, request.method.as_str(), &request.url);
        record.auth = request.header("authorization").map(redact_authorization);
        record.request_body = request
            .body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned());
        record.request_tags = serde_json::to_string(&self.trace).unwrap_or_default();
        record.response_status = response.map(|r| r.status);
        record.response_body = response.map(|r| r.body.clone());

        if let Err(e) = self.logger.log(&record) {
            tracing::warn!(error = %format!("{e:#}"), "could not log request");
        }
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, HttpError> {
    serde_json::to_vec(body).map_err(HttpError::Encode)
}

fn decode<T: DeserializeOwned>(response: UpstreamResponse) -> Result<T, HttpError> {
    let status = response.status;
    let decoded = if response.body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(&response.body)
    };
    decoded.map_err(|cause| HttpError::Decode { status, cause })
}

/// Builder for [`HttpHandler`].
#[derive(Default)]
pub struct HttpHandlerBuilder {
    transport: Option<Arc<dyn Transport>>,
    logger: Option<Arc<dyn RequestLogger>>,
    scope_headers: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    trace: TraceContext,
    origin_service: Option<String>,
    retry_on: Option<BTreeSet<u16>>,
    max_retries: Option<u32>,
    log_requests: Option<bool>,
}

impl HttpHandlerBuilder {
    /// Propagate the caller's credential, locale and trace context.
    pub fn scope(mut self, scope: &RequestScope) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {}", scope.token()));
        headers.insert("accept-language".to_string(), scope.locale().to_string());
        for (name, value) in scope.trace_context() {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        self.scope_headers = headers;
        self.trace = scope.trace_context().clone();
        self
    }

    /// Extra instance headers; these win over scope-derived ones.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// An empty set keeps the default retryable statuses.
    pub fn retry_on(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = Some(statuses.into_iter().collect());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn logger<L: RequestLogger + 'static>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = Some(enabled);
        self
    }

    pub fn origin_service(mut self, name: impl Into<String>) -> Self {
        self.origin_service = Some(name.into());
        self
    }

    /// Take the origin service and audit default from `settings`.
    ///
    /// Values set explicitly on the builder are kept.
    pub fn from_settings(mut self, settings: &Settings) -> Self {
        if self.origin_service.is_none() {
            self.origin_service = Some(settings.service_name.clone());
        }
        if self.log_requests.is_none() {
            self.log_requests = Some(settings.log_internal_requests);
        }
        self
    }

    /// Fails only when no transport was given and the default client can't
    /// be created.
    pub fn build(self) -> Result<HttpHandler, TransportError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let mut headers = self.scope_headers;
        headers.extend(self.headers);

        Ok(HttpHandler {
            transport,
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingRequestLogger)),
            headers,
            trace: self.trace,
            origin_service: self
                .origin_service
                .unwrap_or_else(|| Settings::default().service_name),
            retry_on: self
                .retry_on
                .filter(|statuses| !statuses.is_empty())
                .unwrap_or_else(|| DEFAULT_RETRY_ON.into_iter().collect()),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            log_requests: self.log_requests.unwrap_or(false),
        })
    }
}
