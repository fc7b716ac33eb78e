//! Booking endpoints.
//!
//! - POST /api/bookings - Create a pending booking
//! - GET /api/bookings/:id - Booking with its property name
//! - POST /api/bookings/:id/complete - Mark a finished stay completed
//! - GET /api/bookings/:id/events - Audit trail

use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use surfstay_core::ledger::{BookingEvent, NewBooking};
use surfstay_core::{Booking, BookingId, Money, Property, PropertyId};
use surfstay_web::{AppError, ValidJson, ValidPath};

/// Request to create a booking.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Property to book
    pub property_id: PropertyId,
    /// First night (`YYYY-MM-DD`)
    pub check_in: NaiveDate,
    /// Departure day (`YYYY-MM-DD`)
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests: u32,
    /// Total the client displayed; verified, never stored
    #[serde(default)]
    pub total_price: Option<u64>,
    /// Guest name
    #[serde(default)]
    pub guest_name: Option<String>,
    /// Guest email
    #[serde(default)]
    pub guest_email: Option<String>,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(request: CreateBookingRequest) -> Self {
        Self {
            property_id: request.property_id,
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            quoted_total: request.total_price.map(Money::new),
            guest_name: request.guest_name.filter(|n| !n.trim().is_empty()),
            guest_email: request.guest_email.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Booking with the listing name shown on confirmation pages.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// The booking
    pub booking: Booking,
    /// Listing name
    pub property_name: String,
}

impl BookingResponse {
    fn new(booking: Booking, property: Property) -> Self {
        Self {
            booking,
            property_name: property.name,
        }
    }
}

/// Completed stay.
#[derive(Debug, Serialize)]
pub struct CompletedResponse {
    /// The booking, now completed
    pub booking: Booking,
}

/// Create a pending booking.
///
/// # Errors
///
/// 400 on validation, date range or capacity failures, 404 for an unknown
/// property, 409 when the dates are taken.
pub async fn create_booking(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let (booking, property) = state.ledger.create(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::new(booking, property)),
    ))
}

/// Fetch a booking.
///
/// # Errors
///
/// 404 if the booking does not exist.
pub async fn get_booking(
    State(state): State<AppState>,
    ValidPath(booking_id): ValidPath<BookingId>,
) -> Result<Json<BookingResponse>, AppError> {
    let (booking, property) = state.ledger.get_with_property(booking_id).await?;
    Ok(Json(BookingResponse::new(booking, property)))
}

/// Complete a confirmed stay whose check-out date has passed.
///
/// # Errors
///
/// 400 if the booking is not confirmed and paid or check-out is still
/// ahead, 404 if it does not exist.
pub async fn complete_booking(
    State(state): State<AppState>,
    ValidPath(booking_id): ValidPath<BookingId>,
) -> Result<Json<CompletedResponse>, AppError> {
    let booking = state.ledger.complete_stay(booking_id).await?;
    Ok(Json(CompletedResponse { booking }))
}

/// Audit trail of a booking, oldest first.
///
/// # Errors
///
/// 404 if the booking does not exist.
pub async fn booking_history(
    State(state): State<AppState>,
    ValidPath(booking_id): ValidPath<BookingId>,
) -> Result<Json<Vec<BookingEvent>>, AppError> {
    // distinguishes an unknown booking from an empty trail
    state.ledger.get(booking_id).await?;
    Ok(Json(state.ledger.history(booking_id).await?))
}
