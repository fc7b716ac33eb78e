//! Business metrics for the booking core.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `surfstay_bookings_total{status}` - Bookings by transition (created, confirmed, cancelled, completed)
//! - `surfstay_booking_conflicts_total` - Create requests rejected for overlapping dates
//! - `surfstay_invoices_total{outcome}` - Invoice creation attempts (created, failed)
//! - `surfstay_webhooks_total{outcome}` - Webhook notifications by reconcile outcome
//! - `surfstay_booking_revenue_total` - Confirmed booking value in whole PHP
//!
//! ## Gauges
//! - `surfstay_pending_bookings` - Bookings awaiting payment

use crate::types::{BookingStatus, Money};
use metrics::{describe_counter, describe_gauge};

/// Initialize and register all business metrics descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "surfstay_bookings_total",
        "Total number of booking transitions by resulting status"
    );
    describe_gauge!(
        "surfstay_pending_bookings",
        "Current number of bookings awaiting payment"
    );
    describe_counter!(
        "surfstay_booking_conflicts_total",
        "Booking requests rejected because the dates were taken"
    );
    describe_counter!(
        "surfstay_invoices_total",
        "Invoice creation attempts by outcome"
    );
    describe_counter!(
        "surfstay_webhooks_total",
        "Payment notifications by reconcile outcome"
    );
    describe_counter!(
        "surfstay_booking_revenue_total",
        "Value of confirmed bookings in whole currency units"
    );

    tracing::info!("Business metrics registered");
}

/// Record a new pending booking.
pub fn record_booking_created() {
    metrics::counter!("surfstay_bookings_total", "status" => "created").increment(1);
    metrics::gauge!("surfstay_pending_bookings").increment(1.0);
}

/// Record a booking leaving or moving along the lifecycle.
pub fn record_booking_transition(from: BookingStatus, to: BookingStatus) {
    metrics::counter!("surfstay_bookings_total", "status" => to.as_str()).increment(1);
    if from == BookingStatus::Pending && to != BookingStatus::Pending {
        metrics::gauge!("surfstay_pending_bookings").decrement(1.0);
    }
    tracing::debug!(from = %from, to = %to, "Recorded booking transition metric");
}

/// Record a create request rejected for overlapping dates.
pub fn record_booking_conflict() {
    metrics::counter!("surfstay_booking_conflicts_total").increment(1);
}

/// Record confirmed booking value.
pub fn record_revenue(amount: Money) {
    metrics::counter!("surfstay_booking_revenue_total").increment(amount.units());
}

/// Record an invoice creation attempt.
///
/// # Arguments
///
/// * `outcome` - `"created"` or `"failed"`
pub fn record_invoice(outcome: &'static str) {
    metrics::counter!("surfstay_invoices_total", "outcome" => outcome).increment(1);
}

/// Record a handled webhook notification.
pub fn record_webhook(outcome: &'static str) {
    metrics::counter!("surfstay_webhooks_total", "outcome" => outcome).increment(1);
}
