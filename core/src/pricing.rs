//! Pricing calculator.
//!
//! `total = round_half_up(base * nights * (1 + commission))`, computed in
//! basis points with a `u128` intermediate so there is no floating point.

use crate::types::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const BASIS_POINTS: u128 = 10_000;

/// Platform commission as basis points (1 bp = 0.01%)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// Creates a rate from basis points
    #[must_use]
    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    /// Rate in basis points
    #[must_use]
    pub const fn basis_points(&self) -> u32 {
        self.0
    }
}

/// The 12% service fee applied to every booking
pub const STANDARD_COMMISSION: CommissionRate = CommissionRate::from_basis_points(1_200);

/// Price breakdown shown before booking and charged after
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Nights charged, at least 1
    pub nights: u32,
    /// Base price per night
    pub nightly_rate: Money,
    /// `nightly_rate * nights`
    pub subtotal: Money,
    /// `total - subtotal`
    pub commission: Money,
    /// Amount stored on the booking and invoiced
    pub total: Money,
}

/// Number of nights charged for a stay.
///
/// Same-day and inverted ranges are floored to one night. Callers reject
/// those ranges before pricing; the floor only keeps the function total.
#[must_use]
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    let days = (check_out - check_in).num_days();
    u32::try_from(days.max(1)).unwrap_or(u32::MAX)
}

/// Computes the full price breakdown for a stay.
#[must_use]
pub fn quote(
    base_price: Money,
    check_in: NaiveDate,
    check_out: NaiveDate,
    rate: CommissionRate,
) -> PriceQuote {
    let nights = nights_between(check_in, check_out);
    let subtotal = u128::from(base_price.units()) * u128::from(nights);
    let scaled = subtotal * (BASIS_POINTS + u128::from(rate.basis_points()));
    // half-up: add half the divisor before truncating
    let total = (scaled + BASIS_POINTS / 2) / BASIS_POINTS;

    let subtotal = saturate(subtotal);
    let total = saturate(total);

    PriceQuote {
        nights,
        nightly_rate: base_price,
        subtotal,
        commission: total.checked_sub(subtotal).unwrap_or(Money::ZERO),
        total,
    }
}

/// Total price for a stay, the value stored on the booking.
#[must_use]
pub fn price(
    base_price: Money,
    check_in: NaiveDate,
    check_out: NaiveDate,
    rate: CommissionRate,
) -> Money {
    quote(base_price, check_in, check_out, rate).total
}

fn saturate(units: u128) -> Money {
    Money::new(u64::try_from(units).unwrap_or(u64::MAX))
}
