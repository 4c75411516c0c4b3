// handler/webhooks.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};

use crate::{error::HttpError, service::error::ServiceError, AppState};

/// POST /api/webhooks/payment-events
///
/// Retry contract: only genuinely transient failures (ledger unavailable,
/// processor unreachable) are answered non-2xx so the processor redelivers.
/// Malformed payloads are logged and acknowledged to stop redelivery storms.
pub async fn payment_events_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("webhook-signature")
        .and_then(|h| h.to_str().ok());

    match app_state.webhook_service.process(signature, &body).await {
        Ok(()) => Ok(Json(serde_json::json!({ "status": "success" }))),
        Err(ServiceError::Validation(msg)) => {
            tracing::warn!("Discarding malformed webhook event: {}", msg);
            Ok(Json(serde_json::json!({ "status": "ignored" })))
        }
        Err(e) => Err(HttpError::from(e)),
    }
}
