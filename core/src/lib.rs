//! # SurfStay Core
//!
//! Booking and payment core for the SurfStay vacation-rental service.
//!
//! A guest's date and guest-count selection becomes a reserved inventory slot,
//! a priced invoice, and eventually a confirmed or cancelled booking once the
//! payment provider calls back.
//!
//! ## Components
//!
//! - **Availability**: half-open date-range overlap against active bookings
//! - **Pricing**: nightly rate times nights plus the platform commission
//! - **Ledger**: the booking state machine, a pure reducer plus the service
//!   that loads, reduces and persists with optimistic concurrency
//! - **Payment**: invoice creation through a [`payment::PaymentGateway`]
//! - **Webhook**: reconciliation of provider status notifications
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell: transitions are computed by
//!   [`ledger::BookingReducer`] without I/O
//! - Dependency Injection via Environment: stores, gateway and clock are traits
//! - Every persisted transition emits [`ledger::BookingEvent`]s; an idempotent
//!   replay emits none
//!
//! ## Example
//!
//! ```ignore
//! let ledger = BookingLedger::new(properties, bookings, Arc::new(SystemClock));
//! let (booking, property) = ledger.create(NewBooking {
//!     property_id,
//!     check_in,
//!     check_out,
//!     guests: 2,
//!     quoted_total: None,
//!     guest_name: Some("Ana".into()),
//!     guest_email: None,
//! }).await?;
//! ```

pub mod availability;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod payment;
pub mod pricing;
pub mod retry;
pub mod store;
pub mod types;
pub mod webhook;

// Re-export commonly used types
pub use error::{BookingError, GatewayError, StoreError};
pub use smallvec::{SmallVec, smallvec};
pub use types::{Booking, BookingId, BookingStatus, Money, PaymentStatus, Property, PropertyId};

/// Reducer module - the pure state transition abstraction
pub mod reducer {
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state machines
    ///
    /// A reducer validates an action against the current state and returns
    /// the events describing what happened. It performs no I/O; the caller
    /// applies and persists the events.
    ///
    /// An empty event list means the action was valid but changed nothing,
    /// which is how idempotent replays are expressed.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The facts produced by a successful reduction
        type Event;

        /// The rejection type for invalid actions
        type Error;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into the events it produces
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is not allowed in `state`.
        fn reduce(
            &self,
            state: &Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Self::Event; 4]>, Self::Error>;
    }
}

/// Environment module - Injected dependencies
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Today's calendar date (UTC)
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
