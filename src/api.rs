use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::info;

/// Liveness listener: `GET /health` answers `OK`, everything else is a 404.
pub fn create_router() -> Router {
    Router::new()
        .route(
            "/health",
            get(health_check).head(not_found).fallback(not_found),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(access_log))
}

async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or("-").trim().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    // method path "user-agent" ip status duration
    info!(
        target: "access",
        "{} {} \"{}\" {} {} {:.3}ms",
        method,
        path,
        user_agent,
        ip,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    response
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
