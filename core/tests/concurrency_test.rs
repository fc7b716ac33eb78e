//! Concurrency tests for overlapping booking requests and racing transitions.
//!
//! Run with: `cargo test -p surfstay-core --test concurrency_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use std::sync::Arc;
use std::time::Duration;
use surfstay_core::environment::SystemClock;
use surfstay_core::ledger::{BookingEvent, BookingLedger};
use surfstay_core::retry::RetryPolicy;
use surfstay_core::store::{BookingStore, PropertyStore, StoreFuture};
use surfstay_core::{Booking, BookingError, BookingId, BookingStatus, PropertyId, StoreError};
use surfstay_testing::InMemoryStore;
use surfstay_testing::fixtures::{new_booking, property};

const REQUESTS: usize = 64;

/// Store wrapper that sleeps between the availability read and the caller's
/// insert, widening the check-then-act window
struct SlowReads {
    inner: Arc<InMemoryStore>,
}

impl BookingStore for SlowReads {
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        self.inner.get_booking(id)
    }

    fn list_active_bookings_for_property(
        &self,
        property_id: PropertyId,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let active = self.inner.list_active_bookings_for_property(property_id).await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, StoreError>(active)
        })
    }

    fn insert_booking(&self, booking: Booking, event: BookingEvent) -> StoreFuture<'_, ()> {
        self.inner.insert_booking(booking, event)
    }

    fn update_booking(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> StoreFuture<'_, ()> {
        self.inner.update_booking(booking, expected_version, events)
    }

    fn booking_events(&self, id: BookingId) -> StoreFuture<'_, Vec<BookingEvent>> {
        self.inner.booking_events(id)
    }
}

async fn race(ledgers: Vec<BookingLedger>, property_id: PropertyId) -> (usize, usize) {
    let mut handles = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let ledger = ledgers[i % ledgers.len()].clone();
        // every request overlaps every other on 2025-03-05
        let (check_in, check_out) = if i % 2 == 0 {
            ("2025-03-01", "2025-03-06")
        } else {
            ("2025-03-05", "2025-03-09")
        };
        handles.push(tokio::spawn(async move {
            ledger
                .create(new_booking(property_id, check_in, check_out, 2))
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => created += 1,
            Err(BookingError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    (created, conflicts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_overlapping_creates_in_one_process_yield_one_booking() {
    let store = Arc::new(InMemoryStore::new());
    let property = store.add_property(property(1000, 4));
    let slow: Arc<dyn BookingStore> = Arc::new(SlowReads {
        inner: store.clone(),
    });
    let ledger = BookingLedger::new(store.clone() as Arc<dyn PropertyStore>, slow, Arc::new(SystemClock));

    let (created, conflicts) = race(vec![ledger], property.id).await;

    assert_eq!(created, 1);
    assert_eq!(conflicts, REQUESTS - 1);
    assert_eq!(store.bookings().len(), 1);
}

/// Separate ledgers do not share property locks, like separate server
/// instances; only the store's write-time exclusion prevents double booking.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_overlapping_creates_across_instances_yield_one_booking() {
    let store = Arc::new(InMemoryStore::new());
    let property = store.add_property(property(1000, 4));

    let ledgers = (0..8)
        .map(|_| {
            let slow: Arc<dyn BookingStore> = Arc::new(SlowReads {
                inner: store.clone(),
            });
            BookingLedger::new(store.clone() as Arc<dyn PropertyStore>, slow, Arc::new(SystemClock))
        })
        .collect();

    let (created, conflicts) = race(ledgers, property.id).await;

    assert_eq!(created, 1);
    assert_eq!(conflicts, REQUESTS - 1);
    let active: Vec<_> = store.bookings().into_iter().filter(Booking::is_active).collect();
    assert_eq!(active.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_attach_and_confirm_race_loses_no_update() {
    for _ in 0..20 {
        let store = Arc::new(InMemoryStore::new());
        let property = store.add_property(property(1000, 4));
        let ledger = BookingLedger::new(store.clone(), store.clone(), Arc::new(SystemClock))
            .with_retry_policy(RetryPolicy::immediate(10));

        let (booking, _) = ledger
            .create(new_booking(property.id, "2025-03-01", "2025-03-04", 2))
            .await
            .unwrap();

        let attach = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.attach_payment_reference(booking.id, "inv_1").await })
        };
        let confirm = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.confirm(booking.id, "inv_1").await })
        };

        attach.await.unwrap().unwrap();
        confirm.await.unwrap().unwrap();

        let stored = ledger.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_reference.as_deref(), Some("inv_1"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_webhook_confirms_apply_once() {
    let store = Arc::new(InMemoryStore::new());
    let property = store.add_property(property(1000, 4));
    let ledger = BookingLedger::new(store.clone(), store.clone(), Arc::new(SystemClock))
        .with_retry_policy(RetryPolicy::immediate(REQUESTS));
    let (booking, _) = ledger
        .create(new_booking(property.id, "2025-03-01", "2025-03-04", 2))
        .await
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.confirm(booking.id, "inv_1").await })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_applied() {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    let confirmations = store
        .events()
        .into_iter()
        .filter(|e| matches!(e, BookingEvent::BookingConfirmed { .. }))
        .count();
    assert_eq!(confirmations, 1);
}
