//! Payment endpoint.
//!
//! POST /api/payments creates a hosted invoice for a pending booking and
//! returns the URL the guest is redirected to.

use crate::server::state::AppState;
use axum::{Json, extract::State};
use serde::Deserialize;
use surfstay_core::BookingId;
use surfstay_core::payment::CheckoutSession;
use surfstay_web::{AppError, CorrelationId, ValidJson};

/// Request to pay for a booking.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Booking to pay for
    pub booking_id: BookingId,
}

/// Create an invoice for a pending booking.
///
/// # Errors
///
/// 400 if the booking is not pending, 404 if it does not exist, 500 if the
/// payment provider fails.
pub async fn create_invoice(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    ValidJson(request): ValidJson<CreateInvoiceRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = state
        .payments
        .create_invoice(request.booking_id)
        .await
        .inspect_err(|error| {
            tracing::warn!(%correlation_id, booking_id = %request.booking_id, error = %error, "Checkout failed");
        })?;
    Ok(Json(session))
}
