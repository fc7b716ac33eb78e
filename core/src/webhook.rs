//! Webhook reconciliation of invoice status notifications.
//!
//! Notifications arrive at least once and in any order. Every outcome the
//! provider cannot fix by redelivering is acknowledged; only a storage
//! failure is surfaced so the provider retries, which is safe because the
//! ledger transitions are idempotent.

use crate::error::BookingError;
use crate::ledger::{BookingLedger, Transition};
use crate::metrics;
use crate::payment::EXTERNAL_ID_PREFIX;
use crate::types::{BookingId, BookingStatus};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Invoice status reported by the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvoiceStatus {
    /// Paid, funds not yet settled
    Paid,
    /// Paid and settled
    Settled,
    /// Expired unpaid
    Expired,
    /// Payment attempt failed
    Failed,
    /// Anything else (e.g. `PENDING`)
    Other(String),
}

impl InvoiceStatus {
    /// Parses the provider's upper-case status string
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "PAID" => Self::Paid,
            "SETTLED" => Self::Settled,
            "EXPIRED" => Self::Expired,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Raw notification body; every field is optional so a malformed payload
/// is still decoded and can be acknowledged
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InvoiceNotification {
    /// `booking-{uuid}`
    #[serde(default)]
    pub external_id: Option<String>,
    /// Provider status
    #[serde(default)]
    pub status: Option<String>,
    /// Provider invoice id
    #[serde(default)]
    pub id: Option<String>,
}

/// Why a notification could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// `external_id` missing or without the booking prefix
    #[error("external_id {0:?} does not reference a booking")]
    MissingPrefix(Option<String>),

    /// Suffix after the prefix is not a UUID
    #[error("external_id {0:?} has an invalid booking id")]
    InvalidBookingId(String),

    /// Paid notification without an invoice id
    #[error("paid notification without invoice id")]
    MissingInvoiceId,

    /// Callback token header absent while one is configured
    #[error("missing callback token")]
    MissingCallbackToken,

    /// Callback token header does not match
    #[error("invalid callback token")]
    InvalidCallbackToken,
}

/// Extracts the booking id from a provider `external_id`
///
/// # Errors
///
/// [`WebhookError::MissingPrefix`] or [`WebhookError::InvalidBookingId`].
pub fn parse_external_id(external_id: &str) -> Result<BookingId, WebhookError> {
    let suffix = external_id
        .strip_prefix(EXTERNAL_ID_PREFIX)
        .ok_or_else(|| WebhookError::MissingPrefix(Some(external_id.to_string())))?;
    suffix
        .parse()
        .map_err(|_| WebhookError::InvalidBookingId(external_id.to_string()))
}

/// Checks the callback token header against the configured one.
///
/// No configured token accepts every caller.
///
/// # Errors
///
/// [`WebhookError::MissingCallbackToken`] or [`WebhookError::InvalidCallbackToken`].
pub fn verify_callback_token(expected: Option<&str>, provided: Option<&str>) -> Result<(), WebhookError> {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        return Ok(());
    };
    let provided = provided.ok_or(WebhookError::MissingCallbackToken)?;

    // constant-time comparison
    let matches = expected.len() == provided.len()
        && expected
            .as_bytes()
            .iter()
            .zip(provided.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;

    if matches {
        Ok(())
    } else {
        Err(WebhookError::InvalidCallbackToken)
    }
}

/// What handling a notification did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Booking moved to confirmed/paid
    Confirmed(BookingId),
    /// Booking moved to cancelled
    Cancelled(BookingId),
    /// Booking was already in the target state, or a late failure was
    /// ignored for a paid booking
    AlreadyApplied(BookingId),
    /// Payment arrived for a booking already cancelled; needs a refund
    PaidAfterCancellation(BookingId),
    /// A second invoice was paid for a booking already confirmed through
    /// another one; needs a refund
    DuplicatePayment(BookingId),
    /// No booking with that id
    UnknownBooking(BookingId),
    /// Status the ledger does not act on
    Ignored(String),
    /// Payload could not be interpreted
    Malformed(WebhookError),
}

impl ReconcileOutcome {
    /// Metric label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::Cancelled(_) => "cancelled",
            Self::AlreadyApplied(_) => "already_applied",
            Self::PaidAfterCancellation(_) => "paid_after_cancellation",
            Self::DuplicatePayment(_) => "duplicate_payment",
            Self::UnknownBooking(_) => "unknown_booking",
            Self::Ignored(_) => "ignored",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Applies invoice notifications to the ledger
#[derive(Clone)]
pub struct WebhookReconciler {
    ledger: BookingLedger,
}

impl WebhookReconciler {
    /// Creates a reconciler over the ledger
    #[must_use]
    pub const fn new(ledger: BookingLedger) -> Self {
        Self { ledger }
    }

    /// Handles a decoded notification body
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] only for transient storage failures.
    pub async fn reconcile(
        &self,
        notification: &InvoiceNotification,
    ) -> Result<ReconcileOutcome, BookingError> {
        let Some(external_id) = notification.external_id.as_deref() else {
            return Ok(Self::malformed(WebhookError::MissingPrefix(None)));
        };
        self.handle_notification(
            external_id,
            notification.status.as_deref().unwrap_or_default(),
            notification.id.as_deref(),
        )
        .await
    }

    /// Applies one status notification.
    ///
    /// PAID/SETTLED confirm, EXPIRED/FAILED cancel, anything else is
    /// ignored. Safe to call any number of times with the same input.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] only for transient storage failures.
    #[instrument(skip(self))]
    pub async fn handle_notification(
        &self,
        external_id: &str,
        status: &str,
        invoice_id: Option<&str>,
    ) -> Result<ReconcileOutcome, BookingError> {
        let booking_id = match parse_external_id(external_id) {
            Ok(id) => id,
            Err(error) => return Ok(Self::malformed(error)),
        };

        let outcome = match InvoiceStatus::parse(status) {
            InvoiceStatus::Paid | InvoiceStatus::Settled => {
                let Some(invoice_id) = invoice_id.filter(|id| !id.is_empty()) else {
                    return Ok(Self::malformed(WebhookError::MissingInvoiceId));
                };
                match self.ledger.confirm(booking_id, invoice_id).await? {
                    Transition::Missing => ReconcileOutcome::UnknownBooking(booking_id),
                    Transition::Applied { .. } => ReconcileOutcome::Confirmed(booking_id),
                    Transition::Unchanged(booking) if booking.status == BookingStatus::Cancelled => {
                        ReconcileOutcome::PaidAfterCancellation(booking_id)
                    }
                    Transition::Unchanged(booking)
                        if booking.payment_reference.as_deref() != Some(invoice_id) =>
                    {
                        ReconcileOutcome::DuplicatePayment(booking_id)
                    }
                    Transition::Unchanged(_) => ReconcileOutcome::AlreadyApplied(booking_id),
                }
            }
            InvoiceStatus::Expired | InvoiceStatus::Failed => {
                match self.ledger.cancel_for_payment_failure(booking_id).await? {
                    Transition::Missing => ReconcileOutcome::UnknownBooking(booking_id),
                    Transition::Applied { .. } => ReconcileOutcome::Cancelled(booking_id),
                    Transition::Unchanged(_) => ReconcileOutcome::AlreadyApplied(booking_id),
                }
            }
            InvoiceStatus::Other(other) => {
                tracing::debug!(status = %other, "Notification status ignored");
                ReconcileOutcome::Ignored(other)
            }
        };

        metrics::record_webhook(outcome.as_str());
        tracing::info!(outcome = outcome.as_str(), "Notification reconciled");
        Ok(outcome)
    }

    fn malformed(error: WebhookError) -> ReconcileOutcome {
        tracing::warn!(error = %error, "Malformed payment notification acknowledged");
        let outcome = ReconcileOutcome::Malformed(error);
        metrics::record_webhook(outcome.as_str());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_external_id() {
        let id = BookingId::new();
        assert_eq!(parse_external_id(&format!("booking-{id}")), Ok(id));
        assert!(matches!(
            parse_external_id(&id.to_string()),
            Err(WebhookError::MissingPrefix(_))
        ));
        assert!(matches!(
            parse_external_id("booking-not-a-uuid"),
            Err(WebhookError::InvalidBookingId(_))
        ));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(InvoiceStatus::parse("PAID"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("SETTLED"), InvoiceStatus::Settled);
        assert_eq!(InvoiceStatus::parse("EXPIRED"), InvoiceStatus::Expired);
        assert_eq!(InvoiceStatus::parse("FAILED"), InvoiceStatus::Failed);
        assert_eq!(
            InvoiceStatus::parse("paid"),
            InvoiceStatus::Other("paid".to_string())
        );
    }

    #[test]
    fn test_callback_token() {
        assert_eq!(verify_callback_token(None, None), Ok(()));
        assert_eq!(verify_callback_token(Some(""), None), Ok(()));
        assert_eq!(verify_callback_token(Some("secret"), Some("secret")), Ok(()));
        assert_eq!(
            verify_callback_token(Some("secret"), None),
            Err(WebhookError::MissingCallbackToken)
        );
        assert_eq!(
            verify_callback_token(Some("secret"), Some("secreT")),
            Err(WebhookError::InvalidCallbackToken)
        );
        assert_eq!(
            verify_callback_token(Some("secret"), Some("secret2")),
            Err(WebhookError::InvalidCallbackToken)
        );
    }

    #[test]
    fn test_notification_decodes_partial_payloads() {
        let n: InvoiceNotification = serde_json::from_str(r#"{"status":"PAID"}"#).unwrap_or_default();
        assert_eq!(n.status.as_deref(), Some("PAID"));
        assert!(n.external_id.is_none());
    }
}
