//! Availability checking.
//!
//! Stays are half-open `[check_in, check_out)` ranges: a guest leaving on
//! day D does not conflict with one arriving on day D. Only bookings whose
//! status holds dates (pending, confirmed) are considered.

use crate::error::BookingError;
use crate::store::BookingStore;
use crate::types::{Booking, PropertyId};
use chrono::NaiveDate;
use std::sync::Arc;

/// A half-open date range of nights
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StayRange {
    /// First night
    pub check_in: NaiveDate,
    /// Departure day, exclusive
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Creates a range, rejecting empty and inverted ones
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidDateRange`] if `check_out <= check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        if check_out <= check_in {
            return Err(BookingError::InvalidDateRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Range occupied by an existing booking
    #[must_use]
    pub const fn of(booking: &Booking) -> Self {
        Self {
            check_in: booking.check_in,
            check_out: booking.check_out,
        }
    }
}

/// Whether two half-open ranges share at least one night
#[must_use]
pub fn overlaps(a: StayRange, b: StayRange) -> bool {
    a.check_in < b.check_out && a.check_out > b.check_in
}

/// First active booking that overlaps `range`, if any
///
/// Inactive bookings in `existing` are skipped, so callers may pass an
/// unfiltered list.
#[must_use]
pub fn first_conflict(existing: &[Booking], range: StayRange) -> Option<&Booking> {
    existing
        .iter()
        .find(|b| b.is_active() && overlaps(StayRange::of(b), range))
}

/// Answers "can these dates still be booked" against the booking store
#[derive(Clone)]
pub struct AvailabilityChecker {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityChecker {
    /// Creates a checker over the given store
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    /// Whether no active booking on `property_id` overlaps the range
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidDateRange`] if `check_out <= check_in`
    /// - [`BookingError::Storage`] if the store fails
    pub async fn is_available(
        &self,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, BookingError> {
        let range = StayRange::new(check_in, check_out)?;
        let existing = self
            .bookings
            .list_active_bookings_for_property(property_id)
            .await?;

        let conflict = first_conflict(&existing, range);
        if let Some(booking) = conflict {
            tracing::debug!(
                property_id = %property_id,
                conflicting_booking = %booking.id,
                "Requested dates overlap an active booking"
            );
        }
        Ok(conflict.is_none())
    }
}
