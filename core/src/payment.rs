//! Payment gateway adapter.
//!
//! Creates a hosted invoice for a pending booking and records the invoice id
//! on it. The invoice amount is the booking's stored total, never recomputed.

use crate::error::{BookingError, GatewayError};
use crate::ledger::BookingLedger;
use crate::metrics;
use crate::types::{Booking, BookingId, BookingStatus, Property};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Prefix joining a provider `external_id` to a booking id
pub const EXTERNAL_ID_PREFIX: &str = "booking-";

/// How long an invoice stays payable before the provider expires it
pub const INVOICE_DURATION: Duration = Duration::from_secs(3600);

/// Payment channels offered on the hosted invoice page
pub const PAYMENT_METHODS: [&str; 5] = ["GCASH", "GRABPAY", "PAYMAYA", "CARD", "BANK_TRANSFER"];

/// Provider `external_id` for a booking
#[must_use]
pub fn external_id_for(booking_id: BookingId) -> String {
    format!("{EXTERNAL_ID_PREFIX}{booking_id}")
}

/// Customer block of an invoice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCustomer {
    /// Name shown on the invoice
    pub given_names: String,
    /// Receipt address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Invoice creation request, serialized as the provider expects it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// `booking-{uuid}`
    pub external_id: String,
    /// Whole currency units
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
    /// Line shown to the payer
    pub description: String,
    /// Payer details
    pub customer: InvoiceCustomer,
    /// Where the payer lands after paying
    pub success_redirect_url: String,
    /// Where the payer lands after a failed payment
    pub failure_redirect_url: String,
    /// Seconds until the invoice expires
    pub invoice_duration: u64,
    /// Enabled payment channels
    pub payment_methods: Vec<String>,
}

/// Invoice returned by the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Provider invoice id
    pub id: String,
    /// Hosted payment page
    pub invoice_url: String,
    /// Provider status, `PENDING` on creation
    #[serde(default)]
    pub status: Option<String>,
}

/// Boxed future returned by gateway operations
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Payment gateway trait
///
/// Abstraction over hosted-invoice providers.
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted invoice
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the provider rejects the request or
    /// cannot be reached.
    fn create_invoice(&self, request: InvoiceRequest) -> GatewayFuture<'_, Invoice>;
}

/// Invoice fields that come from deployment configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceSettings {
    /// ISO currency code
    pub currency: String,
    /// Public base URL for redirect links, without trailing slash
    pub app_base_url: String,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            currency: "PHP".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// What the client needs to send the guest to pay
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    /// Hosted payment page
    pub invoice_url: String,
    /// Provider invoice id
    pub invoice_id: String,
}

/// Builds invoices for pending bookings and records their references
#[derive(Clone)]
pub struct PaymentAdapter {
    ledger: BookingLedger,
    gateway: Arc<dyn PaymentGateway>,
    settings: InvoiceSettings,
}

impl PaymentAdapter {
    /// Creates a new adapter
    #[must_use]
    pub fn new(ledger: BookingLedger, gateway: Arc<dyn PaymentGateway>, settings: InvoiceSettings) -> Self {
        Self {
            ledger,
            gateway,
            settings,
        }
    }

    /// Builds the provider request for a booking
    #[must_use]
    pub fn invoice_request(&self, booking: &Booking, property: &Property) -> InvoiceRequest {
        let base = self.settings.app_base_url.trim_end_matches('/');
        InvoiceRequest {
            external_id: external_id_for(booking.id),
            amount: booking.total_price.units(),
            currency: self.settings.currency.clone(),
            description: format!(
                "SurfStay Siargao - {} ({} to {})",
                property.name, booking.check_in, booking.check_out
            ),
            customer: InvoiceCustomer {
                given_names: booking
                    .guest_name
                    .clone()
                    .unwrap_or_else(|| "Guest".to_string()),
                email: booking.guest_email.clone(),
            },
            success_redirect_url: format!("{base}/bookings/{}?status=success", booking.id),
            failure_redirect_url: format!("{base}/bookings/{}?status=failed", booking.id),
            invoice_duration: INVOICE_DURATION.as_secs(),
            payment_methods: PAYMENT_METHODS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Creates an invoice for a pending booking.
    ///
    /// On gateway failure the booking is left exactly as it was, still
    /// pending, so the guest can retry.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the booking does not exist
    /// - [`BookingError::InvalidState`] if the booking is not pending
    /// - [`BookingError::PaymentGateway`] if the provider fails
    /// - [`BookingError::Storage`] if a store fails
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn create_invoice(&self, booking_id: BookingId) -> Result<CheckoutSession, BookingError> {
        let (booking, property) = self.ledger.get_with_property(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidState {
                booking_id,
                status: booking.status,
                operation: "create an invoice for",
            });
        }

        let request = self.invoice_request(&booking, &property);
        let invoice = match self.gateway.create_invoice(request).await {
            Ok(invoice) => invoice,
            Err(error) => {
                metrics::record_invoice("failed");
                tracing::error!(error = %error, "Invoice creation failed, booking stays pending");
                return Err(error.into());
            }
        };
        metrics::record_invoice("created");
        tracing::info!(invoice_id = %invoice.id, amount = %booking.total_price, "Invoice created");

        self.ledger
            .attach_payment_reference(booking_id, &invoice.id)
            .await?;

        Ok(CheckoutSession {
            invoice_url: invoice.invoice_url,
            invoice_id: invoice.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_format() {
        let id = BookingId::new();
        assert_eq!(external_id_for(id), format!("booking-{id}"));
    }

    #[test]
    fn test_customer_email_omitted_when_absent() {
        let customer = InvoiceCustomer {
            given_names: "Guest".to_string(),
            email: None,
        };
        let json = serde_json::to_value(&customer).unwrap_or_default();
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_invoice_status_is_optional() {
        let invoice: Result<Invoice, _> =
            serde_json::from_str(r#"{"id":"inv_1","invoice_url":"https://checkout/inv_1"}"#);
        assert!(matches!(invoice, Ok(Invoice { status: None, .. })));
    }
}
