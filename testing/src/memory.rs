//! In-memory property and booking store.

use std::collections::HashMap;
use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use surfstay_core::availability::{StayRange, first_conflict};
use surfstay_core::ledger::BookingEvent;
use surfstay_core::store::{BookingStore, PropertyStore, StoreFuture};
use surfstay_core::{Booking, BookingId, Property, PropertyId, StoreError};

#[derive(Default)]
struct Ledger {
    bookings: HashMap<BookingId, Booking>,
    events: Vec<BookingEvent>,
}

/// Property and booking store held in process memory.
///
/// Overlap re-check and insert happen under one lock, so the store enforces
/// the same exclusion the database constraint does. Failures can be injected
/// to exercise error paths.
#[derive(Default)]
pub struct InMemoryStore {
    properties: RwLock<HashMap<PropertyId, Property>>,
    ledger: Mutex<Ledger>,
    failing_writes: AtomicUsize,
    conflicting_updates: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a property listing
    pub fn add_property(&self, property: Property) -> Property {
        self.properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property.id, property.clone());
        property
    }

    /// Stores a booking as-is, bypassing exclusion checks
    pub fn seed_booking(&self, booking: Booking) {
        self.lock().bookings.insert(booking.id, booking);
    }

    /// Snapshot of every booking
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().bookings.values().cloned().collect()
    }

    /// Every event stored, in write order
    #[must_use]
    pub fn events(&self) -> Vec<BookingEvent> {
        self.lock().events.clone()
    }

    /// Makes the next `n` writes fail with a database error
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` updates lose a version race, as if another writer
    /// committed first
    pub fn conflict_next_updates(&self, n: usize) {
        self.conflicting_updates.store(n, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        if Self::take(&self.failing_writes) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        Ok(())
    }

    fn insert(&self, booking: Booking, event: BookingEvent) -> Result<(), StoreError> {
        self.injected_failure()?;
        let mut ledger = self.lock();

        let existing: Vec<Booking> = ledger
            .bookings
            .values()
            .filter(|b| b.property_id == booking.property_id)
            .cloned()
            .collect();
        if booking.is_active() && first_conflict(&existing, StayRange::of(&booking)).is_some() {
            return Err(StoreError::Overlap(booking.property_id));
        }

        ledger.bookings.insert(booking.id, booking);
        ledger.events.push(event);
        Ok(())
    }

    fn update(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> Result<(), StoreError> {
        self.injected_failure()?;
        let mut ledger = self.lock();

        let current = ledger
            .bookings
            .get(&booking.id)
            .ok_or(StoreError::BookingNotFound(booking.id))?;
        if current.version != expected_version || Self::take(&self.conflicting_updates) {
            return Err(StoreError::VersionConflict {
                booking_id: booking.id,
                expected: expected_version,
                actual: current.version,
            });
        }

        ledger.bookings.insert(booking.id, booking);
        ledger.events.extend(events);
        Ok(())
    }
}

impl PropertyStore for InMemoryStore {
    fn get_property(&self, id: PropertyId) -> StoreFuture<'_, Option<Property>> {
        let property = self
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        Box::pin(ready(Ok(property)))
    }
}

impl BookingStore for InMemoryStore {
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        let booking = self.lock().bookings.get(&id).cloned();
        Box::pin(ready(Ok(booking)))
    }

    fn list_active_bookings_for_property(
        &self,
        property_id: PropertyId,
    ) -> StoreFuture<'_, Vec<Booking>> {
        let active = self
            .lock()
            .bookings
            .values()
            .filter(|b| b.property_id == property_id && b.is_active())
            .cloned()
            .collect();
        Box::pin(ready(Ok(active)))
    }

    fn insert_booking(&self, booking: Booking, event: BookingEvent) -> StoreFuture<'_, ()> {
        Box::pin(ready(self.insert(booking, event)))
    }

    fn update_booking(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(ready(self.update(booking, expected_version, events)))
    }

    fn booking_events(&self, id: BookingId) -> StoreFuture<'_, Vec<BookingEvent>> {
        let events = self
            .lock()
            .events
            .iter()
            .filter(|e| e.booking_id() == id)
            .cloned()
            .collect();
        Box::pin(ready(Ok(events)))
    }
}
