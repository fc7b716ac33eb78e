//! Listing endpoints.
//!
//! - GET /api/properties/:id - Listing details
//! - GET /api/properties/:id/quote?check_in&check_out - Price and availability

use crate::server::state::AppState;
use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::Deserialize;
use surfstay_core::ledger::StayQuote;
use surfstay_core::{Property, PropertyId};
use surfstay_web::{AppError, ValidPath, ValidQuery};

/// Stay dates to quote.
#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    /// First night
    pub check_in: NaiveDate,
    /// Departure day
    pub check_out: NaiveDate,
}

/// Fetch a listing.
///
/// # Errors
///
/// 404 if the property does not exist.
pub async fn get_property(
    State(state): State<AppState>,
    ValidPath(property_id): ValidPath<PropertyId>,
) -> Result<Json<Property>, AppError> {
    Ok(Json(state.ledger.property(property_id).await?))
}

/// Price a stay and report whether the dates are free.
///
/// # Errors
///
/// 400 for an invalid date range, 404 if the property does not exist.
pub async fn quote_stay(
    State(state): State<AppState>,
    ValidPath(property_id): ValidPath<PropertyId>,
    ValidQuery(params): ValidQuery<QuoteParams>,
) -> Result<Json<StayQuote>, AppError> {
    let quote = state
        .ledger
        .quote(property_id, params.check_in, params.check_out)
        .await?;
    Ok(Json(quote))
}
