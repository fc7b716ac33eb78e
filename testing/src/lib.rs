//! # SurfStay Testing
//!
//! Testing utilities for the SurfStay booking core.
//!
//! This crate provides:
//! - `FixedClock` for deterministic time
//! - `ReducerTest`, a given/when/then harness for reducers
//! - `InMemoryStore`, a property and booking store with write-time
//!   overlap exclusion (also used by the server's in-memory mode)
//! - `MockPaymentGateway`, a scriptable invoice provider
//! - Fixtures for properties and dates
//!
//! ## Example
//!
//! ```ignore
//! use surfstay_testing::{InMemoryStore, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_create_booking() {
//!     let store = Arc::new(InMemoryStore::new());
//!     let property = store.add_property(fixtures::property(1000, 4));
//!     let ledger = BookingLedger::new(store.clone(), store, Arc::new(test_clock()));
//!
//!     let (booking, _) = ledger.create(fixtures::new_booking(property.id, "2025-02-01", "2025-02-04", 2)).await?;
//!     assert_eq!(booking.total_price, Money::new(3360));
//! }
//! ```

mod gateway;
mod memory;

use chrono::{DateTime, Utc};
use surfstay_core::environment::Clock;

pub use gateway::{GatewayBehavior, MockPaymentGateway};
pub use memory::InMemoryStore;
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::NaiveDate;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use surfstay_testing::mocks::FixedClock;
    /// use surfstay_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a clock fixed at midnight UTC of `date`
        #[must_use]
        pub fn on(date: NaiveDate) -> Self {
            Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made domain values for tests
pub mod fixtures {
    use chrono::NaiveDate;
    use surfstay_core::ledger::NewBooking;
    use surfstay_core::{Money, Property, PropertyId};

    /// Parses `YYYY-MM-DD`
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid date.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("fixture dates are valid")
    }

    /// A property with the given nightly rate and capacity
    #[must_use]
    pub fn property(base_price: u64, max_guests: u32) -> Property {
        Property::new(
            PropertyId::new(),
            "Cloud 9 Surf Villa",
            "General Luna",
            Money::new(base_price),
            max_guests,
        )
    }

    /// A booking request without quoted total or guest details
    #[must_use]
    pub fn new_booking(property_id: PropertyId, check_in: &str, check_out: &str, guests: u32) -> NewBooking {
        NewBooking {
            property_id,
            check_in: date(check_in),
            check_out: date(check_out),
            guests,
            quoted_total: None,
            guest_name: None,
            guest_email: None,
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
