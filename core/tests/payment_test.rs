//! Payment adapter tests against the scriptable gateway.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use surfstay_core::ledger::BookingLedger;
use surfstay_core::payment::{InvoiceSettings, PaymentAdapter};
use surfstay_core::{Booking, BookingError, BookingId, BookingStatus, GatewayError};
use surfstay_testing::fixtures::{new_booking, property};
use surfstay_testing::{InMemoryStore, MockPaymentGateway, test_clock};

struct Harness {
    ledger: BookingLedger,
    gateway: MockPaymentGateway,
    adapter: PaymentAdapter,
    booking: Booking,
}

async fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let property = store.add_property(property(1000, 4));
    let ledger = BookingLedger::new(store.clone(), store, Arc::new(test_clock()));
    let gateway = MockPaymentGateway::new();
    let adapter = PaymentAdapter::new(
        ledger.clone(),
        Arc::new(gateway.clone()),
        InvoiceSettings {
            currency: "PHP".to_string(),
            app_base_url: "https://surfstay.example/".to_string(),
        },
    );

    let mut request = new_booking(property.id, "2025-02-01", "2025-02-04", 2);
    request.guest_email = Some("ana@example.com".to_string());
    let (booking, _) = ledger.create(request).await.unwrap();

    Harness {
        ledger,
        gateway,
        adapter,
        booking,
    }
}

#[tokio::test]
async fn test_invoice_carries_stored_total_and_booking_details() {
    let h = harness().await;

    let session = h.adapter.create_invoice(h.booking.id).await.unwrap();
    assert_eq!(session.invoice_id, "inv_1");

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.external_id, format!("booking-{}", h.booking.id));
    assert_eq!(request.amount, 3360);
    assert_eq!(request.currency, "PHP");
    assert_eq!(request.invoice_duration, 3600);
    assert_eq!(
        request.description,
        "SurfStay Siargao - Cloud 9 Surf Villa (2025-02-01 to 2025-02-04)"
    );
    assert_eq!(request.customer.given_names, "Guest");
    assert_eq!(request.customer.email.as_deref(), Some("ana@example.com"));
    assert_eq!(
        request.success_redirect_url,
        format!("https://surfstay.example/bookings/{}?status=success", h.booking.id)
    );
    assert_eq!(
        request.failure_redirect_url,
        format!("https://surfstay.example/bookings/{}?status=failed", h.booking.id)
    );
    assert_eq!(
        request.payment_methods,
        vec!["GCASH", "GRABPAY", "PAYMAYA", "CARD", "BANK_TRANSFER"]
    );
}

#[tokio::test]
async fn test_success_attaches_reference_and_keeps_pending() {
    let h = harness().await;

    let session = h.adapter.create_invoice(h.booking.id).await.unwrap();
    let stored = h.ledger.get(h.booking.id).await.unwrap();

    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(stored.payment_reference.as_deref(), Some(session.invoice_id.as_str()));
}

#[tokio::test]
async fn test_gateway_failure_leaves_booking_untouched() {
    let h = harness().await;
    h.gateway.fail_next(GatewayError::Rejected {
        status: 400,
        message: "API_VALIDATION_ERROR".to_string(),
    });

    let result = h.adapter.create_invoice(h.booking.id).await;

    assert!(matches!(result, Err(BookingError::PaymentGateway(_))));
    assert_eq!(h.ledger.get(h.booking.id).await.unwrap(), h.booking);

    // the guest can retry
    assert!(h.adapter.create_invoice(h.booking.id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let h = harness().await;
    assert!(matches!(
        h.adapter.create_invoice(BookingId::new()).await,
        Err(BookingError::NotFound { .. })
    ));
    assert!(h.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_non_pending_booking_is_invalid_state() {
    let h = harness().await;
    h.ledger.confirm(h.booking.id, "inv_0").await.unwrap();

    assert!(matches!(
        h.adapter.create_invoice(h.booking.id).await,
        Err(BookingError::InvalidState {
            status: BookingStatus::Confirmed,
            ..
        })
    ));
    assert!(h.gateway.requests().is_empty());
}
