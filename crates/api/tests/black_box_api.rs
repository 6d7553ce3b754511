use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use restkit_api::{
    ApiResult, ClaimsValidator, JwtState, RequestContext, guarded, health_routes, responses, with_jwt_auth,
};
use restkit_auth::{Identity, RoleRank};
use restkit_http::{HttpHandler, ReqwestTransport, RequestOptions};
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: &str, roles: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "user_id": user_id,
        "roles": roles,
        "claims": {"shop": ["shop-1"], "organization": ["org-1"]},
        "exp": now + 600,
        "iat": now - 5,
        "auth_time": now - 5,
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"signature-checked-elsewhere"),
    )
    .expect("failed to encode jwt")
}

/// The peer service the app under test calls out to.
fn upstream() -> Router {
    let flaky_calls = Arc::new(AtomicUsize::new(0));

    Router::new()
        .route(
            "/users/:id",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                Json(json!({
                    "id": id,
                    "language": header("accept-language"),
                    "request_id": header("x-request-id"),
                    "authorized": header("authorization").starts_with("Bearer "),
                }))
            }),
        )
        .route(
            "/flaky",
            get(move || {
                let calls = flaky_calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})))
                    } else {
                        (StatusCode::OK, Json(json!({"attempt": 2})))
                    }
                }
            }),
        )
        .route(
            "/charge",
            post(|| async {
                (
                    StatusCode::PAYMENT_REQUIRED,
                    Json(json!({"code": "no_credit", "reason": "top up first"})),
                )
            }),
        )
}

#[derive(Clone)]
struct Peer(String);

fn client(context: &RequestContext) -> HttpHandler {
    HttpHandler::builder()
        .scope(context)
        .transport(ReqwestTransport::new().expect("reqwest client"))
        .build()
        .expect("client")
}

async fn profile(context: RequestContext, Extension(peer): Extension<Peer>) -> ApiResult<Json<Value>> {
    let user_id = context.user_id().unwrap_or_default();
    let user: Value = client(&context)
        .get(&format!("{}/users/{user_id}", peer.0), RequestOptions::new())
        .await?;
    Ok(Json(user))
}

async fn flaky(context: RequestContext, Extension(peer): Extension<Peer>) -> ApiResult<Json<Value>> {
    let body: Value = client(&context)
        .get(&format!("{}/flaky", peer.0), RequestOptions::new())
        .await?;
    Ok(Json(body))
}

async fn charge(context: RequestContext, Extension(peer): Extension<Peer>) -> ApiResult<Json<Value>> {
    let body: Value = client(&context)
        .post(&format!("{}/charge", peer.0), &json!({"amount": 10}), RequestOptions::new())
        .await?;
    Ok(Json(body))
}

async fn shops(Extension(identity): Extension<Identity>) -> axum::response::Response {
    responses::ok(json!({ "shops": identity.shops(), "organizations": identity.organizations() }))
}

fn app(peer: &str) -> Router {
    let staff = Router::new()
        .route("/profile", get(profile))
        .route("/flaky", get(flaky))
        .route("/charge", post(charge));
    let admin = Router::new().route("/admin/shops", get(shops));

    let router = Router::new()
        .merge(guarded(staff, RoleRank::Staff))
        .merge(guarded(admin, RoleRank::Admin))
        .merge(health_routes())
        .layer(Extension(Peer(peer.to_string())));

    with_jwt_auth(router, JwtState::new(ClaimsValidator, ["/health"]))
}

async fn spawn_pair() -> (TestServer, TestServer) {
    let peer = TestServer::spawn(upstream()).await;
    let server = TestServer::spawn(app(&peer.base_url)).await;
    (peer, server)
}

#[tokio::test]
async fn health_is_public() {
    let (_peer, server) = spawn_pair().await;

    let res = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_rejected_before_routing() {
    let (_peer, server) = spawn_pair().await;

    let res = reqwest::get(format!("{}/profile", server.base_url)).await.unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Missing JWT token"}));
}

#[tokio::test]
async fn identity_locale_and_trace_reach_the_peer() {
    let (_peer, server) = spawn_pair().await;
    let http = reqwest::Client::new();

    let res = http
        .get(format!("{}/profile", server.base_url))
        .bearer_auth(mint_jwt("u-7", &["staff"]))
        .header("Accept-Language", "en")
        .header("trace_header", r#"{"X-Request-Id":"req-1"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"id": "u-7", "language": "en", "request_id": "req-1", "authorized": true})
    );
}

#[tokio::test]
async fn insufficient_role_is_forbidden() {
    let (_peer, server) = spawn_pair().await;
    let http = reqwest::Client::new();

    let res = http
        .get(format!("{}/admin/shops", server.base_url))
        .bearer_auth(mint_jwt("u-7", &["staff"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::FORBIDDEN);

    let res = http
        .get(format!("{}/admin/shops", server.base_url))
        .bearer_auth(mint_jwt("u-1", &["admin"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"shops": ["shop-1"], "organizations": ["org-1"]}));
}

#[tokio::test]
async fn upstream_503_is_retried_transparently() {
    let (_peer, server) = spawn_pair().await;

    let res = reqwest::Client::new()
        .get(format!("{}/flaky", server.base_url))
        .bearer_auth(mint_jwt("u-7", &["staff"]))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"attempt": 2}));
}

#[tokio::test]
async fn upstream_402_is_forwarded_with_code_and_reason() {
    let (_peer, server) = spawn_pair().await;

    let res = reqwest::Client::new()
        .post(format!("{}/charge", server.base_url))
        .bearer_auth(mint_jwt("u-7", &["staff"]))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::PAYMENT_REQUIRED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"code": "no_credit", "reason": "top up first"}));
}
