//! Booking ledger: the booking lifecycle state machine.
//!
//! ```text
//! (pending, pending) ──confirm──────────▶ (confirmed, paid) ──complete_stay──▶ (completed, paid)
//!        │
//!        └──cancel_for_payment_failure──▶ (cancelled, pending)
//! ```
//!
//! [`BookingReducer`] decides transitions without I/O. [`BookingLedger`]
//! loads a booking, reduces a [`BookingCommand`], applies the resulting
//! [`BookingEvent`]s and persists them with an expected version.

mod locks;
mod service;

pub use locks::PropertyLocks;
pub use service::{BookingLedger, NewBooking, StayQuote, Transition};

use crate::environment::Clock;
use crate::error::BookingError;
use crate::reducer::Reducer;
use crate::types::{Booking, BookingId, BookingStatus, Money, PaymentStatus, PropertyId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

// ============================================================================
// Commands
// ============================================================================

/// Requests to move an existing booking along its lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingCommand {
    /// Record the invoice created for this booking
    AttachPaymentReference {
        /// Invoice id
        reference: String,
    },
    /// Payment succeeded
    Confirm {
        /// Invoice id reported by the provider
        payment_reference: String,
    },
    /// Payment expired or failed
    CancelForPaymentFailure,
    /// Guest checked out
    CompleteStay,
}

impl BookingCommand {
    /// Verb used in logs and `InvalidState` errors
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::AttachPaymentReference { .. } => "attach payment reference to",
            Self::Confirm { .. } => "confirm",
            Self::CancelForPaymentFailure => "cancel",
            Self::CompleteStay => "complete",
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Audit record of a persisted booking change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BookingEvent {
    /// Booking was reserved and priced
    BookingCreated {
        /// Booking ID
        booking_id: BookingId,
        /// Property booked
        property_id: PropertyId,
        /// First night
        check_in: NaiveDate,
        /// Departure day
        check_out: NaiveDate,
        /// Guest count
        guests: u32,
        /// Price charged
        total_price: Money,
        /// When created
        at: DateTime<Utc>,
    },

    /// Invoice reference stored
    PaymentReferenceAttached {
        /// Booking ID
        booking_id: BookingId,
        /// Invoice id
        reference: String,
        /// When attached
        at: DateTime<Utc>,
    },

    /// Payment received
    BookingConfirmed {
        /// Booking ID
        booking_id: BookingId,
        /// Invoice id that was paid
        payment_reference: String,
        /// When confirmed
        at: DateTime<Utc>,
    },

    /// Payment expired or failed
    BookingCancelled {
        /// Booking ID
        booking_id: BookingId,
        /// When cancelled
        at: DateTime<Utc>,
    },

    /// Stay finished
    StayCompleted {
        /// Booking ID
        booking_id: BookingId,
        /// When completed
        at: DateTime<Utc>,
    },
}

impl BookingEvent {
    /// Creation event for a freshly built booking
    #[must_use]
    pub fn created(booking: &Booking) -> Self {
        Self::BookingCreated {
            booking_id: booking.id,
            property_id: booking.property_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            total_price: booking.total_price,
            at: booking.created_at,
        }
    }

    /// Booking this event belongs to
    #[must_use]
    pub const fn booking_id(&self) -> BookingId {
        match self {
            Self::BookingCreated { booking_id, .. }
            | Self::PaymentReferenceAttached { booking_id, .. }
            | Self::BookingConfirmed { booking_id, .. }
            | Self::BookingCancelled { booking_id, .. }
            | Self::StayCompleted { booking_id, .. } => *booking_id,
        }
    }

    /// When the event happened
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::BookingCreated { at, .. }
            | Self::PaymentReferenceAttached { at, .. }
            | Self::BookingConfirmed { at, .. }
            | Self::BookingCancelled { at, .. }
            | Self::StayCompleted { at, .. } => *at,
        }
    }

    /// Stable event type name, stored alongside the payload
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::BookingCreated { .. } => "BookingCreated",
            Self::PaymentReferenceAttached { .. } => "PaymentReferenceAttached",
            Self::BookingConfirmed { .. } => "BookingConfirmed",
            Self::BookingCancelled { .. } => "BookingCancelled",
            Self::StayCompleted { .. } => "StayCompleted",
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies the reducer reads
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for event timestamps and stay completion
    pub clock: Arc<dyn Clock>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Pure transition rules for a single booking
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to a booking (event sourcing)
    pub fn apply_event(booking: &mut Booking, event: &BookingEvent) {
        match event {
            // creation builds the booking, there is nothing to fold
            BookingEvent::BookingCreated { .. } => {}

            BookingEvent::PaymentReferenceAttached { reference, .. } => {
                booking.payment_reference = Some(reference.clone());
            }

            BookingEvent::BookingConfirmed {
                payment_reference, ..
            } => {
                booking.status = BookingStatus::Confirmed;
                booking.payment_status = PaymentStatus::Paid;
                booking.payment_reference = Some(payment_reference.clone());
            }

            BookingEvent::BookingCancelled { .. } => {
                booking.status = BookingStatus::Cancelled;
            }

            BookingEvent::StayCompleted { .. } => {
                booking.status = BookingStatus::Completed;
            }
        }
        booking.updated_at = event.at();
    }

    fn invalid_state(booking: &Booking, command: &BookingCommand) -> BookingError {
        BookingError::InvalidState {
            booking_id: booking.id,
            status: booking.status,
            operation: command.operation(),
        }
    }
}

impl Reducer for BookingReducer {
    type State = Booking;
    type Action = BookingCommand;
    type Event = BookingEvent;
    type Error = BookingError;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        booking: &Booking,
        command: BookingCommand,
        env: &BookingEnvironment,
    ) -> Result<SmallVec<[BookingEvent; 4]>, BookingError> {
        let now = env.clock.now();
        let reference_held = |reference: &str| booking.payment_reference.as_deref() == Some(reference);

        match (&command, booking.status) {
            // ========== Attach Payment Reference ==========
            (BookingCommand::AttachPaymentReference { reference }, _) if reference.trim().is_empty() => {
                Err(BookingError::Validation(
                    "payment reference must not be empty".to_string(),
                ))
            }
            (BookingCommand::AttachPaymentReference { reference }, BookingStatus::Pending) => {
                if reference_held(reference) {
                    return Ok(SmallVec::new());
                }
                Ok(smallvec![BookingEvent::PaymentReferenceAttached {
                    booking_id: booking.id,
                    reference: reference.clone(),
                    at: now,
                }])
            }
            // The webhook confirmed this invoice before the adapter stored it
            (BookingCommand::AttachPaymentReference { reference }, BookingStatus::Confirmed)
                if reference_held(reference) =>
            {
                Ok(SmallVec::new())
            }
            (BookingCommand::AttachPaymentReference { .. }, _) => {
                Err(Self::invalid_state(booking, &command))
            }

            // ========== Confirm ==========
            (BookingCommand::Confirm { payment_reference }, BookingStatus::Pending) => {
                Ok(smallvec![BookingEvent::BookingConfirmed {
                    booking_id: booking.id,
                    payment_reference: payment_reference.clone(),
                    at: now,
                }])
            }
            // The first paid invoice stays on record; a second one is a
            // double charge for the caller to flag, never a new confirmation
            (
                BookingCommand::Confirm { .. },
                BookingStatus::Confirmed | BookingStatus::Cancelled | BookingStatus::Completed,
            ) => Ok(SmallVec::new()),

            // ========== Cancel For Payment Failure ==========
            (BookingCommand::CancelForPaymentFailure, BookingStatus::Pending) => {
                Ok(smallvec![BookingEvent::BookingCancelled {
                    booking_id: booking.id,
                    at: now,
                }])
            }
            // Cancelled is idempotent; a late failure never regresses a paid booking
            (BookingCommand::CancelForPaymentFailure, _) => Ok(SmallVec::new()),

            // ========== Complete Stay ==========
            (BookingCommand::CompleteStay, BookingStatus::Completed) => Ok(SmallVec::new()),
            (BookingCommand::CompleteStay, BookingStatus::Confirmed)
                if booking.payment_status == PaymentStatus::Paid
                    && env.clock.today() >= booking.check_out =>
            {
                Ok(smallvec![BookingEvent::StayCompleted {
                    booking_id: booking.id,
                    at: now,
                }])
            }
            (BookingCommand::CompleteStay, _) => Err(Self::invalid_state(booking, &command)),
        }
    }
}
