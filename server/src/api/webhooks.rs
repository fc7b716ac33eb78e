//! Xendit invoice webhook.
//!
//! POST /api/webhooks/xendit acknowledges every notification the provider
//! cannot fix by redelivering it. Only a failed callback token (401) and a
//! storage failure while applying a transition (500) are answered otherwise.

use crate::server::state::AppState;
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;
use surfstay_core::metrics::record_webhook;
use surfstay_core::webhook::{InvoiceNotification, verify_callback_token};
use surfstay_web::{AppError, CorrelationId};

/// Header Xendit uses to authenticate callbacks
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Body of every acknowledged notification.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true`
    pub received: bool,
}

const ACK: WebhookAck = WebhookAck { received: true };

/// Apply an invoice status notification.
///
/// # Errors
///
/// 401 on a missing or wrong callback token, 500 when the transition could
/// not be stored.
pub async fn xendit_webhook(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let provided = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    verify_callback_token(state.callback_token.as_deref(), provided).map_err(|error| {
        tracing::warn!(%correlation_id, error = %error, "Webhook rejected");
        AppError::unauthorized(error.to_string())
    })?;

    let notification: InvoiceNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(error) => {
            tracing::warn!(%correlation_id, error = %error, "Undecodable webhook body acknowledged");
            record_webhook("malformed");
            return Ok(Json(ACK));
        }
    };

    match state.reconciler.reconcile(&notification).await {
        Ok(_) => Ok(Json(ACK)),
        Err(error) => {
            tracing::warn!(%correlation_id, error = %error, "Notification left for redelivery");
            Err(AppError::internal("Notification could not be applied, please retry")
                .with_source(anyhow::Error::new(error)))
        }
    }
}
