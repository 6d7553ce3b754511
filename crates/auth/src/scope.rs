//! Per-request caller context.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde_json::Value;

use crate::identity::Identity;
use crate::token::TokenError;

pub const DEFAULT_LOCALE: &str = "ja";

/// Trace propagation headers, forwarded verbatim on outbound calls.
pub type TraceContext = BTreeMap<String, String>;

/// Identity plus the request-derived context needed to call peer services.
///
/// Created once per inbound request and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestScope {
    identity: Identity,
    locale: Option<String>,
    trace: TraceContext,
}

impl RequestScope {
    pub fn new(
        authorization: Option<&str>,
        accept_language: Option<&str>,
        trace: TraceContext,
    ) -> Result<Self, TokenError> {
        Ok(Self::from_identity(
            Identity::from_authorization(authorization)?,
            accept_language,
            trace,
        ))
    }

    pub fn from_identity(identity: Identity, accept_language: Option<&str>, trace: TraceContext) -> Self {
        Self {
            identity,
            locale: accept_language
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
            trace,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Caller locale; never empty.
    pub fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    pub fn trace_context(&self) -> &TraceContext {
        &self.trace
    }
}

impl Deref for RequestScope {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.identity
    }
}

/// Parse a `trace_header` value: a JSON object whose values are forwarded as
/// header values. Non-string scalars are stringified; anything that is not
/// an object yields an empty context.
pub fn parse_trace_header(raw: Option<&str>) -> TraceContext {
    let Some(Ok(Value::Object(map))) = raw.map(serde_json::from_str::<Value>) else {
        return TraceContext::new();
    };

    map.into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Number(n) => Some((k, n.to_string())),
            Value::Bool(b) => Some((k, b.to_string())),
            _ => None,
        })
        .collect()
}
