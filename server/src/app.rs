//! Application wiring.
//!
//! Builds stores, the ledger, the payment adapter and the router from
//! [`Config`]. `PostgreSQL` is the default; `USE_IN_MEMORY_STORE=true` serves
//! from process memory for local development.

use crate::config::Config;
use crate::server::{AppState, build_router};
use crate::xendit::XenditGateway;
use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use surfstay_core::environment::SystemClock;
use surfstay_core::ledger::BookingLedger;
use surfstay_core::payment::{InvoiceSettings, PaymentAdapter, PaymentGateway};
use surfstay_core::store::{BookingStore, PropertyStore};
use surfstay_core::{Money, Property, PropertyId};
use surfstay_postgres::PostgresStore;
use surfstay_testing::{InMemoryStore, MockPaymentGateway};
use uuid::Uuid;

/// Demo listings seeded in development, with stable ids
#[must_use]
pub fn demo_properties() -> Vec<Property> {
    vec![
        Property::new(
            PropertyId::from_uuid(Uuid::from_u128(0x5f1e_0001_0000_4000_8000_0000_0000_0001)),
            "Cloud 9 Surf Villa",
            "General Luna",
            Money::new(3_500),
            4,
        ),
        Property::new(
            PropertyId::from_uuid(Uuid::from_u128(0x5f1e_0001_0000_4000_8000_0000_0000_0002)),
            "Pacifico Beach Bungalow",
            "Pacifico",
            Money::new(2_800),
            2,
        ),
        Property::new(
            PropertyId::from_uuid(Uuid::from_u128(0x5f1e_0001_0000_4000_8000_0000_0000_0003)),
            "Magpupungko Tide House",
            "Pilar",
            Money::new(2_200),
            6,
        ),
    ]
}

/// The assembled service
pub struct SurfStayApp {
    state: AppState,
}

impl SurfStayApp {
    /// Builds the application from configuration.
    ///
    /// # Errors
    ///
    /// Fails if configuration is unusable, the database is unreachable,
    /// migrations fail, or the HTTP client cannot be built.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        if config.database.use_in_memory {
            return Self::in_memory(config);
        }

        config.validate().context("invalid configuration")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(config.database.connect_timeout())
            .idle_timeout(config.database.idle_timeout())
            .connect(&config.database.url)
            .await
            .context("failed to connect to PostgreSQL")?;
        let store = PostgresStore::new(pool);

        if config.database.run_migrations {
            store.migrate().await?;
        }
        if config.app.seed_demo_properties {
            for property in demo_properties() {
                store.upsert_property(&property).await?;
            }
        }

        let gateway = Arc::new(XenditGateway::new(&config.xendit)?);
        let shared = Arc::new(store.clone());
        Ok(Self::assemble(
            config,
            shared.clone(),
            shared,
            gateway,
            Some(store),
        ))
    }

    /// Builds the application over an in-memory store seeded with the demo
    /// listings.
    ///
    /// Without a Xendit secret key, invoices come from a local mock gateway.
    ///
    /// # Errors
    ///
    /// Fails if the Xendit HTTP client cannot be built.
    pub fn in_memory(config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        for property in demo_properties() {
            store.add_property(property);
        }

        let gateway: Arc<dyn PaymentGateway> = if config.xendit.secret_key.trim().is_empty() {
            tracing::warn!("XENDIT_SECRET_KEY is not set, invoices are mocked");
            Arc::new(MockPaymentGateway::new())
        } else {
            Arc::new(XenditGateway::new(&config.xendit)?)
        };

        tracing::info!("Serving from the in-memory store");
        Ok(Self::assemble(config, store.clone(), store, gateway, None))
    }

    /// Builds the application from explicit collaborators.
    #[must_use]
    pub fn assemble(
        config: &Config,
        properties: Arc<dyn PropertyStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        database: Option<PostgresStore>,
    ) -> Self {
        let ledger = BookingLedger::new(properties, bookings, Arc::new(SystemClock));
        let payments = PaymentAdapter::new(
            ledger.clone(),
            gateway,
            InvoiceSettings {
                currency: config.app.currency.clone(),
                app_base_url: config.app.base_url.clone(),
            },
        );

        Self {
            state: AppState::new(ledger, payments, config.xendit.callback_token.clone(), database),
        }
    }

    /// Shared handler state
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The HTTP router
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}
