use crate::infra::AppState;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use contact_relay::contacts::{contact_router, ContactService, MailTransport, SubmissionStore};

pub(crate) fn with_contact_routes<S, T>(service: Arc<ContactService<S, T>>) -> axum::Router
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    contact_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(middleware::from_fn(log_api_requests))
}

const MAX_LOG_LINE_CHARS: usize = 80;

/// Logs one line per `/api` request once the response is ready.
///
/// JSON response bodies are buffered so they can be appended to the line; the
/// handlers here only ever produce small, fully buffered payloads.
pub(crate) async fn log_api_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if !path.starts_with("/api") {
        return response;
    }

    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if !is_json {
        let elapsed = started.elapsed().as_millis();
        info!("{}", request_log_line(&method, &path, status, elapsed, None));
        return response;
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let elapsed = started.elapsed().as_millis();
            info!(
                "{}",
                request_log_line(&method, &path, status, elapsed, Some(&bytes))
            );
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            let elapsed = started.elapsed().as_millis();
            info!("{}", request_log_line(&method, &path, status, elapsed, None));
            tracing::error!(error = %err, %path, "failed to buffer response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `METHOD path status in Nms`, plus ` :: <json>` when a body was captured,
/// cut to 80 characters with a trailing ellipsis.
pub(crate) fn request_log_line(
    method: &Method,
    path: &str,
    status: StatusCode,
    elapsed_ms: u128,
    body: Option<&[u8]>,
) -> String {
    let mut line = format!("{method} {path} {} in {elapsed_ms}ms", status.as_u16());
    if let Some(body) = body.filter(|body| !body.is_empty()) {
        line.push_str(" :: ");
        line.push_str(&String::from_utf8_lossy(body));
    }

    if line.chars().count() > MAX_LOG_LINE_CHARS {
        let mut cut: String = line.chars().take(MAX_LOG_LINE_CHARS - 1).collect();
        cut.push('…');
        return cut;
    }
    line
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
