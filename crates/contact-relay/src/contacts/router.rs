use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use super::notifier::MailTransport;
use super::service::{ContactService, ContactServiceError, SubmissionOutcome};
use super::store::SubmissionStore;

pub const ACCEPTED_MESSAGE: &str = "Message sent successfully!";
pub const DEGRADED_MESSAGE: &str =
    "Message saved but email notification failed. We'll process it manually.";

/// Router builder exposing the contact-form endpoints.
pub fn contact_router<S, T>(service: Arc<ContactService<S, T>>) -> Router
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    Router::new()
        .route(
            "/api/contacts",
            get(list_handler::<S, T>).post(submit_handler::<S, T>),
        )
        .route("/api/test-email", get(test_email_handler::<S, T>))
        .with_state(service)
}

pub(crate) async fn submit_handler<S, T>(
    State(service): State<Arc<ContactService<S, T>>>,
    body: Bytes,
) -> Response
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    // Unparseable bodies are validated as an empty record so the caller gets field errors.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    match service.submit(&payload).await {
        Ok(outcome) => {
            let message = match &outcome {
                SubmissionOutcome::Accepted(_) => ACCEPTED_MESSAGE,
                SubmissionOutcome::AcceptedDegraded { .. } => DEGRADED_MESSAGE,
            };
            let payload = json!({
                "success": true,
                "message": message,
                "contact": outcome.contact().view(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(ContactServiceError::Rejected(errors)) => {
            let payload = json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(ContactServiceError::Store(_)) => {
            let payload = json!({
                "success": false,
                "message": "Failed to send message",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn list_handler<S, T>(State(service): State<Arc<ContactService<S, T>>>) -> Response
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    match service.list() {
        Ok(contacts) => (StatusCode::OK, axum::Json(contacts)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to list contacts");
            let payload = json!({
                "success": false,
                "message": "Failed to fetch contacts",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn test_email_handler<S, T>(
    State(service): State<Arc<ContactService<S, T>>>,
) -> Response
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    match service.send_test_email().await {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "message": "Test email sent successfully!",
                "info": receipt.response,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({
                "success": false,
                "message": "Failed to send test email",
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
