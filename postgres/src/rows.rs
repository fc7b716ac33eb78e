//! Row decoding and integer conversions between domain types and columns.

use sqlx::Row;
use sqlx::postgres::PgRow;
use surfstay_core::ledger::BookingEvent;
use surfstay_core::{
    Booking, BookingId, BookingStatus, Money, PaymentStatus, Property, PropertyId, StoreError,
};
use uuid::Uuid;

pub(crate) const BOOKING_COLUMNS: &str = "id, property_id, check_in, check_out, guests, \
     total_price, guest_name, guest_email, status, payment_status, payment_reference, \
     version, created_at, updated_at";

pub(crate) fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("invalid {column} column: {detail}"))
}

pub(crate) fn to_i64(column: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|e| corrupt(column, e))
}

pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|e| corrupt(column, e))
}

fn to_u64(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|e| corrupt(column, e))
}

fn to_u32(column: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|e| corrupt(column, e))
}

pub(crate) fn property_from_row(row: &PgRow) -> Result<Property, StoreError> {
    let id: Uuid = row.try_get("id").map_err(db_error)?;
    let base_price: i64 = row.try_get("base_price").map_err(db_error)?;
    let max_guests: i32 = row.try_get("max_guests").map_err(db_error)?;

    Ok(Property::new(
        PropertyId::from_uuid(id),
        row.try_get::<String, _>("property_name").map_err(db_error)?,
        row.try_get::<String, _>("barangay").map_err(db_error)?,
        Money::new(to_u64("base_price", base_price)?),
        to_u32("max_guests", max_guests)?,
    ))
}

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let id: Uuid = row.try_get("id").map_err(db_error)?;
    let property_id: Uuid = row.try_get("property_id").map_err(db_error)?;
    let guests: i32 = row.try_get("guests").map_err(db_error)?;
    let total_price: i64 = row.try_get("total_price").map_err(db_error)?;
    let version: i64 = row.try_get("version").map_err(db_error)?;
    let status: String = row.try_get("status").map_err(db_error)?;
    let payment_status: String = row.try_get("payment_status").map_err(db_error)?;

    Ok(Booking {
        id: BookingId::from_uuid(id),
        property_id: PropertyId::from_uuid(property_id),
        check_in: row.try_get("check_in").map_err(db_error)?,
        check_out: row.try_get("check_out").map_err(db_error)?,
        guests: to_u32("guests", guests)?,
        total_price: Money::new(to_u64("total_price", total_price)?),
        guest_name: row.try_get("guest_name").map_err(db_error)?,
        guest_email: row.try_get("guest_email").map_err(db_error)?,
        status: BookingStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        payment_status: PaymentStatus::parse(&payment_status)
            .ok_or_else(|| corrupt("payment_status", &payment_status))?,
        payment_reference: row.try_get("payment_reference").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
        version: to_u64("version", version)?,
    })
}

pub(crate) fn event_from_row(row: &PgRow) -> Result<BookingEvent, StoreError> {
    let payload: serde_json::Value = row.try_get("payload").map_err(db_error)?;
    serde_json::from_value(payload).map_err(|e| corrupt("payload", e))
}

pub(crate) fn event_payload(event: &BookingEvent) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(event)
        .map_err(|e| StoreError::Database(format!("failed to serialize event: {e}")))
}

/// Advisory lock key for a property; collisions only serialize unrelated
/// properties, they never admit an overlap
pub(crate) fn lock_key(property_id: PropertyId) -> i64 {
    let b = property_id.as_uuid().as_bytes();
    i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_stable_per_property() {
        let id = PropertyId::new();
        assert_eq!(lock_key(id), lock_key(id));
    }

    #[test]
    fn test_integer_conversions_reject_out_of_range() {
        assert!(to_i64("total_price", u64::MAX).is_err());
        assert!(to_u64("total_price", -1).is_err());
        assert!(matches!(to_u32("guests", 3), Ok(3)));
    }
}
