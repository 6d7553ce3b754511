//! Audit trail for outbound requests.
//!
//! One [`RequestRecord`] is produced per attempt. Sinks implement
//! [`RequestLogger`]; a failing sink is logged and never replaces the outcome
//! of the call being audited.

use chrono::Utc;
use restkit_core::Settings;
use restkit_pubsub::{LogMe, Publisher, publish_message};
use serde::Serialize;
use serde_json::{Value, json};

/// Visible prefix of a redacted credential.
const VISIBLE_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    pub origin_service: String,
    pub url: String,
    pub method: String,
    /// Redacted `Authorization` header.
    pub auth: Option<String>,
    pub request_body: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
    /// Trace context as a JSON object string.
    pub request_tags: String,
    /// Absent when the request never produced a response.
    pub response_status: Option<u16>,
    pub response_body: Option<String>,
}

impl RequestRecord {
    pub fn new(origin_service: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            origin_service: origin_service.into(),
            url: url.into(),
            method: method.into(),
            auth: None,
            request_body: None,
            timestamp: Utc::now().timestamp(),
            request_tags: String::new(),
            response_status: None,
            response_body: None,
        }
    }

    /// Positional row in the internal-requests table layout.
    pub fn to_row(&self) -> Value {
        json!([
            self.origin_service,
            self.url,
            self.method,
            self.auth,
            self.request_body,
            self.timestamp,
            self.request_tags,
            self.response_status,
            self.response_body,
        ])
    }
}

/// Sink for [`RequestRecord`]s.
pub trait RequestLogger: Send + Sync {
    fn log(&self, record: &RequestRecord) -> anyhow::Result<()>;
}

impl<L: RequestLogger + ?Sized> RequestLogger for std::sync::Arc<L> {
    fn log(&self, record: &RequestRecord) -> anyhow::Result<()> {
        (**self).log(record)
    }
}

/// Writes records as structured events on the `restkit::requests` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn log(&self, record: &RequestRecord) -> anyhow::Result<()> {
        tracing::info!(
            target: "restkit::requests",
            origin_service = %record.origin_service,
            url = %record.url,
            method = %record.method,
            auth = record.auth.as_deref(),
            request_body = record.request_body.as_deref(),
            timestamp = record.timestamp,
            request_tags = %record.request_tags,
            response_status = record.response_status,
            response_body = record.response_body.as_deref(),
            "internal request"
        );
        Ok(())
    }
}

/// Publishes each record as a `LogMe` row for the analytics pipeline.
#[derive(Debug, Clone)]
pub struct LogMeRequestLogger<P> {
    publisher: P,
    topic: String,
    dataset: String,
    table: String,
}

impl<P: Publisher> LogMeRequestLogger<P> {
    pub fn new(publisher: P, topic: impl Into<String>, dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    pub fn from_settings(publisher: P, settings: &Settings) -> Self {
        Self::new(
            publisher,
            &settings.logme_topic,
            &settings.internal_requests_dataset,
            &settings.internal_requests_table,
        )
    }
}

impl<P: Publisher> RequestLogger for LogMeRequestLogger<P> {
    fn log(&self, record: &RequestRecord) -> anyhow::Result<()> {
        let message = LogMe {
            dataset: self.dataset.clone(),
            table: self.table.clone(),
            rows: vec![record.to_row()],
        };
        publish_message(&self.publisher, &self.topic, &message)?;
        Ok(())
    }
}

/// Redact a credential for logging: `Bearer abcdefgh…`.
///
/// Tokens of eight characters or fewer are masked completely.
pub fn redact_authorization(header: &str) -> String {
    let (scheme, token) = match header.trim().split_once(char::is_whitespace) {
        Some((scheme, token)) => (Some(scheme), token.trim()),
        None => (None, header.trim()),
    };

    let masked = if token.chars().count() <= VISIBLE_CHARS {
        "*".repeat(VISIBLE_CHARS)
    } else {
        let visible: String = token.chars().take(VISIBLE_CHARS).collect();
        format!("{visible}…")
    };

    match scheme {
        Some(scheme) => format!("{scheme} {masked}"),
        None => masked,
    }
}
