//! Router configuration for the SurfStay API.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{bookings, payments, properties, webhooks};
use axum::{
    Router,
    routing::{get, post},
};
use surfstay_web::correlation_id_layer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// - `/health`, `/ready`
/// - `/api/bookings`, `/api/payments`, `/api/webhooks/xendit`, `/api/properties`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/complete", post(bookings::complete_booking))
        .route("/bookings/:id/events", get(bookings::booking_history))
        // Payments
        .route("/payments", post(payments::create_invoice))
        .route("/webhooks/xendit", post(webhooks::xendit_webhook))
        // Listings
        .route("/properties/:id", get(properties::get_property))
        .route("/properties/:id/quote", get(properties::quote_stay));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
