//! Axum integration for the SurfStay booking core.
//!
//! Handlers stay thin: extract and validate the request, call the ledger,
//! payment adapter or webhook reconciler, and map the result to HTTP.
//!
//! # Request Flow
//!
//! 1. **Correlation id** is attached by [`correlation_id_layer`]
//! 2. **Extract data** with [`ValidJson`], [`ValidQuery`] or [`ValidPath`]
//!    (decode failures become `400 BAD_REQUEST`)
//! 3. **Call** the core service
//! 4. **Map** [`surfstay_core::BookingError`] through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use surfstay_web::{AppError, ValidJson};
//!
//! async fn create_booking(
//!     State(state): State<AppState>,
//!     ValidJson(request): ValidJson<CreateBookingRequest>,
//! ) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
//!     let (booking, property) = state.ledger.create(request.into()).await?;
//!     Ok((StatusCode::CREATED, Json(BookingResponse::new(booking, property))))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::{CorrelationId, ValidJson, ValidPath, ValidQuery};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
