use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

/// Liveness check.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// `GET /health`, unauthenticated.
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
