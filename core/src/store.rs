//! Storage traits for properties and bookings.
//!
//! Traits return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
//! they stay dyn-compatible and can be injected as `Arc<dyn BookingStore>`.
//!
//! # Write-time exclusion
//!
//! `insert_booking` must re-check overlap against active bookings of the same
//! property atomically with the insert and fail with [`StoreError::Overlap`].
//! The in-process availability check alone cannot close the check-then-act
//! race when several instances serve the same property.

use crate::error::StoreError;
use crate::ledger::BookingEvent;
use crate::types::{Booking, BookingId, Property, PropertyId};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Read-only access to property listings
pub trait PropertyStore: Send + Sync {
    /// Loads a property by id, `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    fn get_property(&self, id: PropertyId) -> StoreFuture<'_, Option<Property>>;
}

/// Persistence for bookings and their audit events
pub trait BookingStore: Send + Sync {
    /// Loads a booking by id, `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Lists bookings of a property whose status holds dates
    /// (pending or confirmed)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    fn list_active_bookings_for_property(
        &self,
        property_id: PropertyId,
    ) -> StoreFuture<'_, Vec<Booking>>;

    /// Inserts a new booking together with its creation event
    ///
    /// # Errors
    ///
    /// - [`StoreError::Overlap`] if an active booking on the same property
    ///   overlaps `[check_in, check_out)`
    /// - [`StoreError::Database`] if the backend fails
    fn insert_booking(&self, booking: Booking, event: BookingEvent) -> StoreFuture<'_, ()>;

    /// Replaces a booking if its stored version equals `expected_version`,
    /// appending `events` in the same write
    ///
    /// The caller passes the booking with its version already incremented.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BookingNotFound`] if the booking does not exist
    /// - [`StoreError::VersionConflict`] if another writer got there first
    /// - [`StoreError::Database`] if the backend fails
    fn update_booking(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> StoreFuture<'_, ()>;

    /// Audit trail for a booking, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    fn booking_events(&self, id: BookingId) -> StoreFuture<'_, Vec<BookingEvent>>;
}
