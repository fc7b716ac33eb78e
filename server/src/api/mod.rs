//! HTTP API handlers.
//!
//! Handlers are thin: decode, call the core service, map errors through
//! [`surfstay_web::AppError`].

pub mod bookings;
pub mod payments;
pub mod properties;
pub mod webhooks;
