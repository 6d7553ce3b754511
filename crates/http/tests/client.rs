use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header};
use restkit_auth::{RequestScope, TraceContext};
use restkit_http::{
    HttpError, HttpHandler, OutboundRequest, RequestLogger, RequestOptions, RequestRecord, ServiceErrorKind, Transport,
    TransportError, UpstreamResponse,
};
use serde_json::{Value, json};

/// Replays canned responses and records every request it sees.
#[derive(Clone, Default)]
struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl ScriptedTransport {
    fn replying(responses: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        let transport = Self::default();
        transport
            .responses
            .lock()
            .unwrap()
            .extend(responses.into_iter().map(|(status, body)| Ok(UpstreamResponse::new(status, body))));
        transport
    }

    fn failing(message: &str) -> Self {
        let transport = Self::default();
        transport
            .responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(message)));
        transport
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> OutboundRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("script exhausted")))
    }
}

#[derive(Clone, Default)]
struct CollectingLogger(Arc<Mutex<Vec<RequestRecord>>>);

impl RequestLogger for CollectingLogger {
    fn log(&self, record: &RequestRecord) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct BrokenLogger;

impl RequestLogger for BrokenLogger {
    fn log(&self, _: &RequestRecord) -> anyhow::Result<()> {
        anyhow::bail!("audit sink unavailable")
    }
}

fn handler(transport: &ScriptedTransport) -> HttpHandler {
    HttpHandler::builder()
        .transport(transport.clone())
        .build()
        .expect("scripted transport needs no client")
}

fn mint_jwt(payload: Value) -> String {
    jsonwebtoken::encode(&Header::default(), &payload, &EncodingKey::from_secret(b"unused"))
        .expect("failed to encode jwt")
}

fn scope() -> RequestScope {
    let token = mint_jwt(json!({"user_id": "u-1", "roles": ["staff"]}));
    let mut trace = TraceContext::new();
    trace.insert("X-Request-Id".to_string(), "req-42".to_string());
    RequestScope::new(Some(&format!("Bearer {token}")), Some("en"), trace).expect("valid token")
}

#[tokio::test]
async fn get_decodes_success_body() {
    let transport = ScriptedTransport::replying([(200, r#"{"id":"1234"}"#)]);

    let body: Value = handler(&transport)
        .get("http://users/1234", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, json!({"id": "1234"}));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn get_maps_404_to_not_found() {
    let transport = ScriptedTransport::replying([(404, r#"{"error":"nope"}"#)]);

    let err = handler(&transport)
        .get::<Value>("http://users/1", RequestOptions::new())
        .await
        .unwrap_err();

    let service = err.as_service().expect("service error");
    assert_eq!(service.kind, ServiceErrorKind::NotFound);
    assert_eq!(service.status, 404);
    assert_eq!(service.body, r#"{"error":"nope"}"#);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn retries_503_then_succeeds() {
    let transport = ScriptedTransport::replying([(503, "busy"), (200, r#"{"ok":true}"#)]);

    let body: Value = handler(&transport)
        .get("http://users/1", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn exhausting_retries_returns_last_error() {
    let transport = ScriptedTransport::replying([(503, ""), (503, ""), (503, ""), (503, "still busy")]);

    let err = handler(&transport)
        .get::<Value>("http://users/1", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.as_service().map(|e| e.kind), Some(ServiceErrorKind::Unexpected));
    assert_eq!(err.as_service().map(|e| e.body.as_str()), Some("still busy"));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test]
async fn empty_per_call_retry_set_keeps_instance_statuses() {
    let transport = ScriptedTransport::replying([(503, "busy"), (200, r#"{"ok":true}"#)]);

    let body: Value = handler(&transport)
        .get("http://users/1", RequestOptions::new().retry_on(Vec::<u16>::new()))
        .await
        .unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn non_retryable_status_fails_immediately() {
    let transport = ScriptedTransport::replying([(500, "boom"), (200, "{}")]);

    let err = handler(&transport)
        .get::<Value>("http://users/1", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.as_service().map(|e| e.kind), Some(ServiceErrorKind::InternalServer));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn per_call_retry_settings_override_instance() {
    let transport = ScriptedTransport::replying([(502, ""), (502, ""), (200, "{}")]);

    let err = handler(&transport)
        .get::<Value>("http://users/1", RequestOptions::new().retry_on([502]).retry(1))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn status_handler_runs_once_across_retries() {
    let transport = ScriptedTransport::replying([(402, r#"{"code":"no_credit","reason":"top up"}"#), (402, "")]);
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();

    let options = RequestOptions::new()
        .retry_on([402])
        .retry(1)
        .on_status(402, move |response| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(response.status, 402);
            Ok(())
        });

    let err = handler(&transport)
        .post::<_, Value>("http://billing/charge", &json!({"amount": 10}), options)
        .await
        .unwrap_err();

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(transport.calls(), 2);
    assert_eq!(err.as_service().map(|e| e.kind), Some(ServiceErrorKind::PaymentRequired));
}

#[tokio::test]
async fn status_handler_can_reject_terminally() {
    let transport = ScriptedTransport::replying([(503, "busy"), (200, "{}")]);

    let options = RequestOptions::new().on_status(503, |_| anyhow::bail!("maintenance window"));
    let err = handler(&transport)
        .get::<Value>("http://users/1", options)
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Rejected { status: 503, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn post_accepts_201_and_sends_json() {
    let transport = ScriptedTransport::replying([(201, r#"{"id":"9"}"#)]);

    let body: Value = handler(&transport)
        .post("http://users", &json!({"name": "Ada"}), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, json!({"id": "9"}));
    let sent = transport.request(0);
    assert_eq!(sent.method, reqwest::Method::POST);
    assert_eq!(serde_json::from_slice::<Value>(sent.body.as_deref().unwrap()).unwrap(), json!({"name": "Ada"}));
}

#[tokio::test]
async fn put_does_not_accept_201() {
    let transport = ScriptedTransport::replying([(201, "{}")]);

    let err = handler(&transport)
        .put::<_, Value>("http://users/1", &json!({}), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(201));
}

#[tokio::test]
async fn empty_success_body_decodes_to_null() {
    let transport = ScriptedTransport::replying([(200, "")]);

    let body: Value = handler(&transport)
        .delete("http://users/1", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, Value::Null);
    assert!(transport.request(0).body.is_none());
}

#[tokio::test]
async fn invalid_success_body_is_a_decode_error() {
    let transport = ScriptedTransport::replying([(200, "<html>")]);

    let err = handler(&transport)
        .patch::<_, Value>("http://users/1", &json!({"a": 1}), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Decode { status: 200, .. }));
}

#[tokio::test]
async fn transport_errors_are_not_retried() {
    let transport = ScriptedTransport::failing("connection refused");

    let err = handler(&transport)
        .get::<Value>("http://users/1", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Transport(_)));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn scope_headers_are_propagated_and_overrides_win() {
    let transport = ScriptedTransport::replying([(200, "{}")]);
    let scope = scope();

    let client = HttpHandler::builder()
        .scope(&scope)
        .header("Accept-Language", "fr")
        .header("X-Client", "orders")
        .transport(transport.clone())
        .build()
        .unwrap();

    client
        .get::<Value>("http://users/1", RequestOptions::new().header("X-Client", "billing"))
        .await
        .unwrap();

    let sent = transport.request(0);
    assert_eq!(sent.header("Authorization"), Some(format!("Bearer {}", scope.token()).as_str()));
    assert_eq!(sent.header("accept-language"), Some("fr"));
    assert_eq!(sent.header("x-request-id"), Some("req-42"));
    assert_eq!(sent.header("x-client"), Some("billing"));

    // Per-call overrides never leak into the instance.
    assert_eq!(client.headers().get("x-client").map(String::as_str), Some("orders"));
}

#[tokio::test]
async fn every_attempt_is_audited_with_redacted_credential() {
    let transport = ScriptedTransport::replying([(503, "busy"), (200, r#"{"id":"1"}"#)]);
    let logger = CollectingLogger::default();

    let client = HttpHandler::builder()
        .scope(&scope())
        .origin_service("orders")
        .log_requests(true)
        .logger(logger.clone())
        .transport(transport.clone())
        .build()
        .unwrap();

    let _: Value = client
        .post("http://users", &json!({"name": "Ada"}), RequestOptions::new())
        .await
        .unwrap();

    let records = logger.0.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].response_status, Some(503));
    assert_eq!(records[1].response_status, Some(200));
    assert_eq!(records[1].origin_service, "orders");
    assert_eq!(records[1].method, "POST");
    assert_eq!(records[1].request_body.as_deref(), Some(r#"{"name":"Ada"}"#));
    assert_eq!(records[1].request_tags, r#"{"X-Request-Id":"req-42"}"#);

    let auth = records[1].auth.as_deref().unwrap();
    assert!(auth.starts_with("Bearer ") && auth.ends_with('…'));
    assert_eq!(auth.chars().count(), "Bearer ".len() + 8 + 1);
}

#[tokio::test]
async fn audit_failures_never_mask_the_outcome() {
    let transport = ScriptedTransport::replying([(404, "")]);

    let client = HttpHandler::builder()
        .log_requests(true)
        .logger(BrokenLogger)
        .transport(transport.clone())
        .build()
        .unwrap();

    let err = client
        .get::<Value>("http://users/1", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.as_service().map(|e| e.kind), Some(ServiceErrorKind::NotFound));
}

#[tokio::test]
async fn auditing_is_off_unless_enabled() {
    let transport = ScriptedTransport::replying([(200, "{}")]);
    let logger = CollectingLogger::default();

    let client = HttpHandler::builder()
        .logger(logger.clone())
        .transport(transport)
        .build()
        .unwrap();

    let _: Value = client.get("http://users/1", RequestOptions::new()).await.unwrap();

    assert!(logger.0.lock().unwrap().is_empty());
}

#[test]
fn settings_provide_origin_and_audit_default() {
    let settings = restkit_core::Settings::from_lookup(|key| match key {
        "SERVICE_NAME" => Some("orders".to_string()),
        "INTERNAL_REQUESTS_LOG_ALL" => Some("true".to_string()),
        _ => None,
    })
    .unwrap();

    let client = HttpHandler::builder()
        .from_settings(&settings)
        .transport(ScriptedTransport::default())
        .build()
        .unwrap();

    assert_eq!(client.max_retries(), 3);
    assert!(client.retry_on().contains(&503));
    assert!(format!("{client:?}").contains("log_requests: true"));
    assert!(format!("{client:?}").contains("\"orders\""));
}

#[test]
fn empty_builder_retry_set_keeps_defaults() {
    let client = HttpHandler::builder()
        .retry_on(Vec::<u16>::new())
        .transport(ScriptedTransport::default())
        .build()
        .unwrap();

    assert!(client.retry_on().contains(&503));
}
