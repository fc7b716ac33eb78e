//! `PostgreSQL` property and booking store for SurfStay.
//!
//! Implements [`PropertyStore`] and [`BookingStore`] from `surfstay-core` on
//! top of a sqlx connection pool:
//!
//! - Booking inserts run in a transaction that takes a per-property advisory
//!   lock and re-checks overlap, backed by an `EXCLUDE USING gist` constraint
//! - Updates are compare-and-set on the `version` column
//! - Booking events are appended as JSONB in the same transaction as the
//!   booking row they describe
//!
//! # Example
//!
//! ```ignore
//! use surfstay_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/surfstay", 10).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;

use rows::{
    BOOKING_COLUMNS, booking_from_row, db_error, event_from_row, event_payload, lock_key,
    property_from_row, to_i32, to_i64,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use surfstay_core::ledger::BookingEvent;
use surfstay_core::store::{BookingStore, PropertyStore, StoreFuture};
use surfstay_core::{Booking, BookingId, Property, PropertyId, StoreError};

/// SQLSTATE for `exclusion_violation`
const EXCLUSION_VIOLATION: &str = "23P01";

/// Store backed by a `PostgreSQL` connection pool
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Runs the embedded migrations
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips a trivial query, used by readiness probes
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Inserts or replaces a property listing
    ///
    /// Listings are managed outside the booking flow; this exists for seeding.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn upsert_property(&self, property: &Property) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO properties (id, property_name, barangay, base_price, max_guests)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                property_name = EXCLUDED.property_name,
                barangay = EXCLUDED.barangay,
                base_price = EXCLUDED.base_price,
                max_guests = EXCLUDED.max_guests",
        )
        .bind(property.id.as_uuid())
        .bind(&property.name)
        .bind(&property.barangay)
        .bind(to_i64("base_price", property.base_price.units())?)
        .bind(to_i32("max_guests", property.max_guests)?)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn insert_in_tx(&self, booking: Booking, event: BookingEvent) -> Result<(), StoreError> {
        let property_id = booking.property_id;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Serializes inserts for one property across every instance sharing
        // the database; released at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock_key(property_id))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let overlapping: Option<(uuid::Uuid,)> = sqlx::query_as(
            "SELECT id FROM bookings
             WHERE property_id = $1
               AND status IN ('pending', 'confirmed')
               AND check_in < $3
               AND check_out > $2
             LIMIT 1",
        )
        .bind(property_id.as_uuid())
        .bind(booking.check_in)
        .bind(booking.check_out)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        if let Some((existing,)) = overlapping {
            tracing::debug!(%property_id, %existing, "Overlapping booking found at insert");
            return Err(StoreError::Overlap(property_id));
        }

        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(booking.id.as_uuid())
        .bind(property_id.as_uuid())
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(to_i32("guests", booking.guests)?)
        .bind(to_i64("total_price", booking.total_price.units())?)
        .bind(&booking.guest_name)
        .bind(&booking.guest_email)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_reference)
        .bind(to_i64("version", booking.version)?)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(property_id, e))?;

        append_events(&mut tx, std::slice::from_ref(&event)).await?;

        tx.commit()
            .await
            .map_err(|e| map_write_error(property_id, e))?;
        Ok(())
    }

    async fn update_in_tx(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            "UPDATE bookings
             SET status = $2,
                 payment_status = $3,
                 payment_reference = $4,
                 updated_at = $5,
                 version = $6
             WHERE id = $1 AND version = $7",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_reference)
        .bind(booking.updated_at)
        .bind(to_i64("version", booking.version)?)
        .bind(to_i64("version", expected_version)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(booking.property_id, e))?;

        if result.rows_affected() == 0 {
            let current: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM bookings WHERE id = $1")
                    .bind(booking.id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;

            return Err(match current {
                None => StoreError::BookingNotFound(booking.id),
                Some((actual,)) => {
                    metrics::counter!("surfstay_store_version_conflicts_total").increment(1);
                    StoreError::VersionConflict {
                        booking_id: booking.id,
                        expected: expected_version,
                        actual: u64::try_from(actual).unwrap_or_default(),
                    }
                }
            });
        }

        append_events(&mut tx, &events).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}

async fn append_events(
    tx: &mut Transaction<'_, Postgres>,
    events: &[BookingEvent],
) -> Result<(), StoreError> {
    for event in events {
        sqlx::query(
            "INSERT INTO booking_events (booking_id, event_type, payload, occurred_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(event.booking_id().as_uuid())
        .bind(event.event_type())
        .bind(event_payload(event)?)
        .bind(event.at())
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

fn map_write_error(property_id: PropertyId, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return StoreError::Overlap(property_id);
        }
    }
    db_error(e)
}

impl PropertyStore for PostgresStore {
    fn get_property(&self, id: PropertyId) -> StoreFuture<'_, Option<Property>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, property_name, barangay, base_price, max_guests
                 FROM properties WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            row.as_ref().map(property_from_row).transpose()
        })
    }
}

impl BookingStore for PostgresStore {
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            row.as_ref().map(booking_from_row).transpose()
        })
    }

    fn list_active_bookings_for_property(
        &self,
        property_id: PropertyId,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = $1 AND status IN ('pending', 'confirmed')
                 ORDER BY check_in"
            ))
            .bind(property_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

            rows.iter().map(booking_from_row).collect()
        })
    }

    fn insert_booking(&self, booking: Booking, event: BookingEvent) -> StoreFuture<'_, ()> {
        Box::pin(self.insert_in_tx(booking, event))
    }

    fn update_booking(
        &self,
        booking: Booking,
        expected_version: u64,
        events: Vec<BookingEvent>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(self.update_in_tx(booking, expected_version, events))
    }

    fn booking_events(&self, id: BookingId) -> StoreFuture<'_, Vec<BookingEvent>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT payload FROM booking_events WHERE booking_id = $1 ORDER BY id",
            )
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

            rows.iter().map(event_from_row).collect()
        })
    }
}
