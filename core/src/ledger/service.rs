//! Booking ledger service: validation, creation and persisted transitions.

use super::{BookingCommand, BookingEnvironment, BookingEvent, BookingReducer, PropertyLocks};
use crate::availability::{AvailabilityChecker, StayRange};
use crate::environment::Clock;
use crate::error::BookingError;
use crate::metrics;
use crate::pricing::{self, PriceQuote, STANDARD_COMMISSION};
use crate::reducer::Reducer;
use crate::retry::{RetryPolicy, retry_with_predicate};
use crate::store::{BookingStore, PropertyStore};
use crate::types::{Booking, BookingId, BookingStatus, Money, Property, PropertyId};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Input for [`BookingLedger::create`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    /// Property to book
    pub property_id: PropertyId,
    /// First night
    pub check_in: NaiveDate,
    /// Departure day, exclusive
    pub check_out: NaiveDate,
    /// Guest count, at least 1
    pub guests: u32,
    /// Total the client displayed; verified, never stored
    pub quoted_total: Option<Money>,
    /// Guest name
    pub guest_name: Option<String>,
    /// Guest email
    pub guest_email: Option<String>,
}

/// Result of a lifecycle transition that tolerates missing bookings
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No booking with that id
    Missing,
    /// Booking exists; the command changed nothing
    Unchanged(Booking),
    /// Booking changed and was persisted
    Applied {
        /// Booking after the transition
        booking: Booking,
        /// Events persisted with it
        events: Vec<BookingEvent>,
    },
}

impl Transition {
    /// The booking after the call, if it exists
    #[must_use]
    pub const fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Missing => None,
            Self::Unchanged(booking) | Self::Applied { booking, .. } => Some(booking),
        }
    }

    /// Whether anything was persisted
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Price and availability for a prospective stay
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StayQuote {
    /// Property quoted
    pub property_id: PropertyId,
    /// First night
    pub check_in: NaiveDate,
    /// Departure day
    pub check_out: NaiveDate,
    /// Whether the dates are currently free
    pub available: bool,
    /// Price breakdown
    #[serde(flatten)]
    pub quote: PriceQuote,
}

/// Creates bookings and moves them through their lifecycle.
///
/// Every transition is load, reduce, persist-with-expected-version. Losing
/// the version race reloads and retries under [`RetryPolicy`], so an invoice
/// attach and a concurrent webhook confirm never lose each other's update.
#[derive(Clone)]
pub struct BookingLedger {
    properties: Arc<dyn PropertyStore>,
    bookings: Arc<dyn BookingStore>,
    availability: AvailabilityChecker,
    env: BookingEnvironment,
    reducer: BookingReducer,
    locks: PropertyLocks,
    retry: RetryPolicy,
}

impl BookingLedger {
    /// Creates a ledger with the standard commission and retry policy
    #[must_use]
    pub fn new(
        properties: Arc<dyn PropertyStore>,
        bookings: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            properties,
            availability: AvailabilityChecker::new(Arc::clone(&bookings)),
            bookings,
            env: BookingEnvironment::new(clock),
            reducer: BookingReducer::new(),
            locks: PropertyLocks::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy for version conflicts
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a pending booking.
    ///
    /// Checks run in this order, each with its own error: date range, guest
    /// count, property existence, capacity, quoted total, availability. The
    /// store re-checks overlap atomically with the insert.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidDateRange`] if `check_out <= check_in`
    /// - [`BookingError::Validation`] for zero guests or a quoted total that
    ///   differs from the server price
    /// - [`BookingError::NotFound`] if the property does not exist
    /// - [`BookingError::CapacityExceeded`] if guests exceed the maximum
    /// - [`BookingError::Conflict`] if the dates overlap an active booking
    /// - [`BookingError::Storage`] if a store fails
    #[instrument(
        skip(self, request),
        fields(
            property_id = %request.property_id,
            check_in = %request.check_in,
            check_out = %request.check_out,
            guests = request.guests,
        )
    )]
    pub async fn create(&self, request: NewBooking) -> Result<(Booking, Property), BookingError> {
        let range = StayRange::new(request.check_in, request.check_out)?;
        if request.guests == 0 {
            return Err(BookingError::Validation(
                "guests must be at least 1".to_string(),
            ));
        }
        let guest_name = normalize(request.guest_name);
        let guest_email = normalize(request.guest_email);

        let property = self.load_property(request.property_id).await?;
        if request.guests > property.max_guests {
            return Err(BookingError::CapacityExceeded {
                requested: request.guests,
                max: property.max_guests,
            });
        }

        let total = pricing::price(property.base_price, range.check_in, range.check_out, STANDARD_COMMISSION);
        if let Some(quoted) = request.quoted_total {
            if quoted != total {
                tracing::warn!(quoted = %quoted, total = %total, "Client total differs from server price");
                return Err(BookingError::Validation(format!(
                    "quoted total {quoted} does not match price {total}"
                )));
            }
        }

        let _guard = self.locks.acquire(property.id).await;

        if !self
            .availability
            .is_available(property.id, range.check_in, range.check_out)
            .await?
        {
            metrics::record_booking_conflict();
            return Err(BookingError::Conflict {
                property_id: property.id,
            });
        }

        let booking = Booking::pending(
            BookingId::new(),
            property.id,
            range.check_in,
            range.check_out,
            request.guests,
            total,
            guest_name,
            guest_email,
            self.env.clock.now(),
        );
        let event = BookingEvent::created(&booking);

        if let Err(error) = self.bookings.insert_booking(booking.clone(), event).await {
            let error = BookingError::from(error);
            if matches!(error, BookingError::Conflict { .. }) {
                // another instance won the range between check and insert
                metrics::record_booking_conflict();
            }
            return Err(error);
        }

        metrics::record_booking_created();
        tracing::info!(booking_id = %booking.id, total_price = %booking.total_price, "Booking created");
        Ok((booking, property))
    }

    /// Stores the invoice reference on a pending booking.
    ///
    /// Succeeds without change if the booking is already confirmed with the
    /// same reference.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the booking does not exist
    /// - [`BookingError::InvalidState`] if the booking is not pending
    /// - [`BookingError::Storage`] / [`BookingError::Contention`] on store failure
    #[instrument(skip(self, reference), fields(booking_id = %booking_id))]
    pub async fn attach_payment_reference(
        &self,
        booking_id: BookingId,
        reference: &str,
    ) -> Result<Booking, BookingError> {
        let command = BookingCommand::AttachPaymentReference {
            reference: reference.to_string(),
        };
        match self.transition(booking_id, command).await? {
            Transition::Missing => Err(BookingError::booking_not_found(booking_id)),
            Transition::Unchanged(booking) | Transition::Applied { booking, .. } => Ok(booking),
        }
    }

    /// Marks a booking confirmed and paid. Idempotent.
    ///
    /// A missing booking, one already cancelled, or a confirmed booking
    /// paid through a different invoice is left alone and logged; none is
    /// an error because notifications race and repeat.
    ///
    /// # Errors
    ///
    /// [`BookingError::Storage`] / [`BookingError::Contention`] on store failure.
    #[instrument(skip(self, payment_reference), fields(booking_id = %booking_id))]
    pub async fn confirm(
        &self,
        booking_id: BookingId,
        payment_reference: &str,
    ) -> Result<Transition, BookingError> {
        let command = BookingCommand::Confirm {
            payment_reference: payment_reference.to_string(),
        };
        let transition = self.transition(booking_id, command).await?;
        match &transition {
            Transition::Missing => {
                tracing::warn!("Confirmation for unknown booking ignored");
            }
            Transition::Unchanged(booking) if booking.status == BookingStatus::Cancelled => {
                tracing::error!(
                    payment_reference,
                    "Payment received for cancelled booking, needs manual refund"
                );
            }
            Transition::Unchanged(booking)
                if booking.payment_reference.as_deref() != Some(payment_reference) =>
            {
                tracing::error!(
                    payment_reference,
                    recorded_reference = booking.payment_reference.as_deref().unwrap_or_default(),
                    "Second invoice paid for confirmed booking, needs manual refund"
                );
            }
            Transition::Unchanged(_) => {
                tracing::debug!("Booking already confirmed");
            }
            Transition::Applied { booking, .. } => {
                metrics::record_revenue(booking.total_price);
                tracing::info!(total_price = %booking.total_price, "Booking confirmed");
            }
        }
        Ok(transition)
    }

    /// Cancels a pending booking after payment expiry or failure. Idempotent.
    ///
    /// Confirmed and completed bookings are never regressed; a missing
    /// booking is a no-op with a warning.
    ///
    /// # Errors
    ///
    /// [`BookingError::Storage`] / [`BookingError::Contention`] on store failure.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn cancel_for_payment_failure(
        &self,
        booking_id: BookingId,
    ) -> Result<Transition, BookingError> {
        let transition = self
            .transition(booking_id, BookingCommand::CancelForPaymentFailure)
            .await?;
        match &transition {
            Transition::Missing => tracing::warn!("Payment failure for unknown booking ignored"),
            Transition::Unchanged(booking) if booking.status != BookingStatus::Cancelled => {
                tracing::warn!(status = %booking.status, "Late payment failure ignored");
            }
            Transition::Unchanged(_) => tracing::debug!("Booking already cancelled"),
            Transition::Applied { .. } => tracing::info!("Booking cancelled for payment failure"),
        }
        Ok(transition)
    }

    /// Marks a confirmed, paid booking completed once check-out has passed.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the booking does not exist
    /// - [`BookingError::InvalidState`] if the booking is not confirmed and
    ///   paid or the check-out date is still ahead
    /// - [`BookingError::Storage`] / [`BookingError::Contention`] on store failure
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn complete_stay(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        match self.transition(booking_id, BookingCommand::CompleteStay).await? {
            Transition::Missing => Err(BookingError::booking_not_found(booking_id)),
            Transition::Unchanged(booking) => Ok(booking),
            Transition::Applied { booking, .. } => {
                tracing::info!("Stay completed");
                Ok(booking)
            }
        }
    }

    /// Loads a booking.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] or [`BookingError::Storage`].
    pub async fn get(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))
    }

    /// Loads a booking with the property it reserves.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] or [`BookingError::Storage`].
    pub async fn get_with_property(
        &self,
        booking_id: BookingId,
    ) -> Result<(Booking, Property), BookingError> {
        let booking = self.get(booking_id).await?;
        let property = self.load_property(booking.property_id).await?;
        Ok((booking, property))
    }

    /// Audit trail of a booking, oldest first.
    ///
    /// # Errors
    ///
    /// [`BookingError::Storage`] if the store fails.
    pub async fn history(&self, booking_id: BookingId) -> Result<Vec<BookingEvent>, BookingError> {
        Ok(self.bookings.booking_events(booking_id).await?)
    }

    /// Loads a property.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] or [`BookingError::Storage`].
    pub async fn property(&self, property_id: PropertyId) -> Result<Property, BookingError> {
        self.load_property(property_id).await
    }

    /// Prices a stay and reports whether the dates are free.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidDateRange`] if `check_out <= check_in`
    /// - [`BookingError::NotFound`] if the property does not exist
    /// - [`BookingError::Storage`] if a store fails
    pub async fn quote(
        &self,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<StayQuote, BookingError> {
        let range = StayRange::new(check_in, check_out)?;
        let property = self.load_property(property_id).await?;
        let available = self
            .availability
            .is_available(property_id, range.check_in, range.check_out)
            .await?;

        Ok(StayQuote {
            property_id,
            check_in,
            check_out,
            available,
            quote: pricing::quote(property.base_price, check_in, check_out, STANDARD_COMMISSION),
        })
    }

    async fn load_property(&self, property_id: PropertyId) -> Result<Property, BookingError> {
        self.properties
            .get_property(property_id)
            .await?
            .ok_or_else(|| BookingError::property_not_found(property_id))
    }

    async fn transition(
        &self,
        booking_id: BookingId,
        command: BookingCommand,
    ) -> Result<Transition, BookingError> {
        retry_with_predicate(
            &self.retry,
            || self.try_transition(booking_id, command.clone()),
            |error| matches!(error, BookingError::Contention { .. }),
        )
        .await
    }

    async fn try_transition(
        &self,
        booking_id: BookingId,
        command: BookingCommand,
    ) -> Result<Transition, BookingError> {
        let Some(booking) = self.bookings.get_booking(booking_id).await? else {
            return Ok(Transition::Missing);
        };

        let events = self.reducer.reduce(&booking, command, &self.env)?;
        if events.is_empty() {
            return Ok(Transition::Unchanged(booking));
        }

        let mut next = booking.clone();
        for event in &events {
            BookingReducer::apply_event(&mut next, event);
        }
        next.version = booking.version + 1;

        let events = events.into_vec();
        self.bookings
            .update_booking(next.clone(), booking.version, events.clone())
            .await?;

        if next.status != booking.status {
            metrics::record_booking_transition(booking.status, next.status);
        }
        Ok(Transition::Applied {
            booking: next,
            events,
        })
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
