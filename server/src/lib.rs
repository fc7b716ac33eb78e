//! SurfStay booking and payment service.
//!
//! Guests pick dates for a Siargao listing, the server prices the stay and
//! records a pending booking, a Xendit invoice is created for it, and the
//! Xendit webhook later confirms or cancels the booking.
//!
//! ```text
//! POST /api/bookings ──► BookingLedger::create ──► (pending, pending)
//! POST /api/payments ──► PaymentAdapter ──► Xendit /v2/invoices
//!                                 └──► attach_payment_reference
//! POST /api/webhooks/xendit ──► WebhookReconciler
//!                                 ├── PAID/SETTLED  ──► (confirmed, paid)
//!                                 └── EXPIRED/FAILED ──► (cancelled, pending)
//! ```
//!
//! # Modules
//!
//! - [`config`]: environment configuration
//! - [`xendit`]: invoice API client
//! - [`api`]: HTTP handlers
//! - [`server`]: state, health checks and router
//! - [`app`]: wiring for `PostgreSQL` or in-memory mode

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod config;
pub mod server;
pub mod xendit;

pub use app::SurfStayApp;
pub use config::Config;
pub use xendit::XenditGateway;
