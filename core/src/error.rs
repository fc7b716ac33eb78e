//! Error types for the booking core.
//!
//! [`BookingError`] is the only error that crosses a public operation
//! boundary. Store and gateway failures are mapped into it.

use crate::types::{BookingId, BookingStatus, PropertyId};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by ledger, availability, pricing and payment operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Request failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Check-out is not strictly after check-in
    #[error("Check-out date {check_out} must be after check-in date {check_in}")]
    InvalidDateRange {
        /// Requested check-in
        check_in: NaiveDate,
        /// Requested check-out
        check_out: NaiveDate,
    },

    /// Referenced resource does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of resource ("Property", "Booking")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Guest count exceeds the property's maximum
    #[error("Property allows at most {max} guests, {requested} requested")]
    CapacityExceeded {
        /// Guests requested
        requested: u32,
        /// Property maximum
        max: u32,
    },

    /// Dates overlap an active booking
    #[error("Property {property_id} is not available for the selected dates")]
    Conflict {
        /// Property that is already booked
        property_id: PropertyId,
    },

    /// Operation not allowed in the booking's current status
    #[error("Cannot {operation} booking {booking_id} in status {status}")]
    InvalidState {
        /// Booking that was targeted
        booking_id: BookingId,
        /// Its current status
        status: BookingStatus,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Concurrent writers kept winning the version race
    #[error("Booking {booking_id} was modified concurrently, retries exhausted")]
    Contention {
        /// Contended booking
        booking_id: BookingId,
    },

    /// Payment provider failed
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// Shorthand for a missing booking
    #[must_use]
    pub fn booking_not_found(id: BookingId) -> Self {
        Self::NotFound {
            resource: "Booking",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing property
    #[must_use]
    pub fn property_not_found(id: PropertyId) -> Self {
        Self::NotFound {
            resource: "Property",
            id: id.to_string(),
        }
    }
}

/// Errors raised by property and booking stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Booking to update does not exist
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// Insert would overlap an active booking on the same property
    #[error("Overlapping active booking on property {0}")]
    Overlap(PropertyId),

    /// Optimistic concurrency check failed
    #[error("Version conflict on booking {booking_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Booking being updated
        booking_id: BookingId,
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::BookingNotFound(id) => Self::booking_not_found(id),
            StoreError::Overlap(property_id) => Self::Conflict { property_id },
            StoreError::VersionConflict { booking_id, .. } => Self::Contention { booking_id },
            StoreError::Database(message) => Self::Storage(message),
        }
    }
}

/// Errors raised by payment gateway implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Provider answered with a non-success status
    #[error("Provider rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Provider message
        message: String,
    },

    /// Credentials refused
    #[error("Provider authentication failed")]
    Unauthorized,

    /// Network or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider response could not be decoded
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<GatewayError> for BookingError {
    fn from(error: GatewayError) -> Self {
        Self::PaymentGateway(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_into_booking_errors() {
        let property_id = PropertyId::new();
        assert_eq!(
            BookingError::from(StoreError::Overlap(property_id)),
            BookingError::Conflict { property_id }
        );

        let booking_id = BookingId::new();
        let mapped = BookingError::from(StoreError::VersionConflict {
            booking_id,
            expected: 1,
            actual: 2,
        });
        assert_eq!(mapped, BookingError::Contention { booking_id });
    }

    #[test]
    fn test_gateway_error_keeps_provider_message() {
        let mapped = BookingError::from(GatewayError::Rejected {
            status: 400,
            message: "INVALID_AMOUNT".to_string(),
        });
        assert!(matches!(mapped, BookingError::PaymentGateway(ref m) if m.contains("INVALID_AMOUNT")));
    }
}
