//! Application state for the SurfStay HTTP server.

use std::sync::Arc;
use surfstay_core::ledger::BookingLedger;
use surfstay_core::payment::PaymentAdapter;
use surfstay_core::webhook::WebhookReconciler;
use surfstay_postgres::PostgresStore;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Booking state machine and queries
    pub ledger: BookingLedger,

    /// Invoice creation for pending bookings
    pub payments: PaymentAdapter,

    /// Applies payment provider notifications
    pub reconciler: WebhookReconciler,

    /// Expected `x-callback-token` on webhooks, `None` disables the check
    pub callback_token: Option<Arc<str>>,

    /// Database checked by the readiness probe, `None` in in-memory mode
    pub database: Option<PostgresStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        ledger: BookingLedger,
        payments: PaymentAdapter,
        callback_token: Option<String>,
        database: Option<PostgresStore>,
    ) -> Self {
        Self {
            reconciler: WebhookReconciler::new(ledger.clone()),
            ledger,
            payments,
            callback_token: callback_token.map(Arc::from),
            database,
        }
    }
}
