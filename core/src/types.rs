//! Domain types for the SurfStay booking ledger.
//!
//! Value objects (identifiers, money), the read-only `Property` view owned by
//! the property store, and the `Booking` entity with its two status axes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a rental property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(Uuid);

impl PropertyId {
    /// Creates a new random `PropertyId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PropertyId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Money Value Object (whole currency units, PHP has no minor unit in invoices)
// ============================================================================

/// An amount in whole currency units.
///
/// Xendit invoices for PHP are charged in whole pesos, so totals are rounded
/// to the unit once, at pricing time, and carried verbatim from then on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from whole units
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole units
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PHP {}", self.0)
    }
}

// ============================================================================
// Property (owned by the property store, read-only here)
// ============================================================================

/// The slice of a property listing the booking core needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property identifier
    pub id: PropertyId,
    /// Listing name shown to guests
    pub name: String,
    /// Barangay (village) the property is in
    pub barangay: String,
    /// Nightly base rate
    pub base_price: Money,
    /// Maximum number of guests, at least 1
    pub max_guests: u32,
}

impl Property {
    /// Creates a new `Property`
    #[must_use]
    pub fn new(
        id: PropertyId,
        name: impl Into<String>,
        barangay: impl Into<String>,
        base_price: Money,
        max_guests: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            barangay: barangay.into(),
            base_price,
            max_guests,
        }
    }
}

// ============================================================================
// Booking
// ============================================================================

/// Lifecycle status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting payment
    Pending,
    /// Paid and confirmed
    Confirmed,
    /// Cancelled after a failed or expired payment
    Cancelled,
    /// Stay finished
    Completed,
}

impl BookingStatus {
    /// Convert status to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parse status from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether a booking in this status holds its dates.
    #[must_use]
    pub const fn holds_dates(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No successful payment yet
    Pending,
    /// Invoice paid
    Paid,
    /// Payment returned to the guest
    Refunded,
}

impl PaymentStatus {
    /// Convert status to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    /// Parse status from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation of a property for a half-open range of nights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Property being booked
    pub property_id: PropertyId,
    /// First night
    pub check_in: NaiveDate,
    /// Departure day, exclusive
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests: u32,
    /// Price charged, computed server-side at creation
    pub total_price: Money,
    /// Guest name, if given
    pub guest_name: Option<String>,
    /// Guest email, if given
    pub guest_email: Option<String>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// External invoice id
    pub payment_reference: Option<String>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the booking last changed
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every persisted transition
    pub version: u64,
}

impl Booking {
    /// Creates a new booking in `(pending, pending)`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn pending(
        id: BookingId,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        total_price: Money,
        guest_name: Option<String>,
        guest_email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            property_id,
            check_in,
            check_out,
            guests,
            total_price,
            guest_name,
            guest_email,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            created_at,
            updated_at: created_at,
            version: 0,
        }
    }

    /// Whether this booking blocks its dates for other guests.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.holds_dates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_storage_form() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("refunded"), None);
        assert_eq!(PaymentStatus::parse("paid"), Some(PaymentStatus::Paid));
    }

    #[test]
    fn test_only_pending_and_confirmed_hold_dates() {
        assert!(BookingStatus::Pending.holds_dates());
        assert!(BookingStatus::Confirmed.holds_dates());
        assert!(!BookingStatus::Cancelled.holds_dates());
        assert!(!BookingStatus::Completed.holds_dates());
    }

    #[test]
    fn test_booking_id_parses_from_string() {
        let id = BookingId::new();
        let parsed: BookingId = id.to_string().parse().unwrap_or_default();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_money_arithmetic() {
        assert_eq!(Money::new(1000).checked_multiply(3), Some(Money::new(3000)));
        assert_eq!(Money::new(5).checked_sub(Money::new(6)), None);
        assert_eq!(Money::new(u64::MAX).checked_add(Money::new(1)), None);
        assert_eq!(Money::new(3360).to_string(), "PHP 3360");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap_or_default();
        assert_eq!(json, "\"confirmed\"");
    }
}
