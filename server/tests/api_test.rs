//! HTTP API integration tests.
//!
//! Drives the full router over the in-memory store and a mock payment
//! gateway: booking creation, invoicing, webhook reconciliation and the
//! error contract.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::too_many_lines)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use surfstay_core::{GatewayError, Property};
use surfstay_server::{Config, SurfStayApp};
use surfstay_testing::{InMemoryStore, MockPaymentGateway, fixtures};
use tower::ServiceExt;

struct Harness {
    router: Router,
    store: Arc<InMemoryStore>,
    gateway: MockPaymentGateway,
    property: Property,
}

fn harness_with(vars: &[(&str, &str)]) -> Harness {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let config = Config::from_lookup(|key| vars.get(key).cloned());

    let store = Arc::new(InMemoryStore::new());
    let property = store.add_property(fixtures::property(1000, 4));
    let gateway = MockPaymentGateway::new();

    let app = SurfStayApp::assemble(
        &config,
        store.clone(),
        store.clone(),
        Arc::new(gateway.clone()),
        None,
    );

    Harness {
        router: app.router(),
        store,
        gateway,
        property,
    }
}

fn harness() -> Harness {
    harness_with(&[])
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

impl Harness {
    async fn create(&self, check_in: &str, check_out: &str, guests: u32) -> (StatusCode, Value) {
        send(
            &self.router,
            Method::POST,
            "/api/bookings",
            Some(json!({
                "property_id": self.property.id,
                "check_in": check_in,
                "check_out": check_out,
                "guests": guests,
                "guest_name": "Alon",
                "guest_email": "alon@example.com",
            })),
            &[],
        )
        .await
    }

    async fn create_booking_id(&self, check_in: &str, check_out: &str) -> String {
        let (status, body) = self.create(check_in, check_out, 2).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["booking"]["id"].as_str().unwrap().to_string()
    }

    async fn webhook(&self, body: Value, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        send(&self.router, Method::POST, "/api/webhooks/xendit", Some(body), headers).await
    }

    async fn booking(&self, id: &str) -> (StatusCode, Value) {
        send(&self.router, Method::GET, &format!("/api/bookings/{id}"), None, &[]).await
    }
}

#[tokio::test]
async fn test_create_booking_prices_on_server() {
    let h = harness();

    let (status, body) = h.create("2025-03-01", "2025-03-04", 2).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["total_price"], 3360);
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["payment_status"], "pending");
    assert_eq!(body["booking"]["guest_email"], "alon@example.com");
    assert_eq!(body["property_name"], "Cloud 9 Surf Villa");
    assert_eq!(h.store.bookings().len(), 1);
}

#[tokio::test]
async fn test_create_booking_rejects_mismatched_total() {
    let h = harness();

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/bookings",
        Some(json!({
            "property_id": h.property.id,
            "check_in": "2025-03-01",
            "check_out": "2025-03-04",
            "guests": 2,
            "total_price": 3000,
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(h.store.bookings().is_empty());
}

#[tokio::test]
async fn test_create_booking_validation_errors() {
    let h = harness();

    let (status, body) = h.create("2025-03-04", "2025-03-01", 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DATE_RANGE");

    let (status, body) = h.create("2025-03-01", "2025-03-01", 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DATE_RANGE");

    let (status, body) = h.create("2025-03-01", "2025-03-04", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = h.create("2025-03-01", "2025-03-04", 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    assert!(h.store.bookings().is_empty());
}

#[tokio::test]
async fn test_create_booking_rejects_undecodable_body() {
    let h = harness();

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/bookings",
        Some(json!({ "property_id": h.property.id, "check_in": "March 1st" })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_create_booking_unknown_property() {
    let h = harness();

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/bookings",
        Some(json!({
            "property_id": "00000000-0000-4000-8000-000000000000",
            "check_in": "2025-03-01",
            "check_out": "2025-03-04",
            "guests": 2,
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_overlapping_booking_conflicts_and_adjacent_is_allowed() {
    let h = harness();
    h.create_booking_id("2025-03-01", "2025-03-04").await;

    let (status, body) = h.create("2025-03-03", "2025-03-06", 2).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // check-out day is free for the next arrival
    let (status, _) = h.create("2025-03-04", "2025-03-06", 2).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(h.store.bookings().len(), 2);
}

#[tokio::test]
async fn test_get_booking() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;

    let (status, body) = h.booking(&id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["id"], id.as_str());
    assert_eq!(body["property_name"], "Cloud 9 Surf Villa");

    let (status, _) = h.booking("00000000-0000-4000-8000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.booking("not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_payment_then_paid_webhook_confirms_booking() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/payments",
        Some(json!({ "booking_id": id })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["invoice_id"], "inv_1");
    assert!(body["invoice_url"].as_str().unwrap().ends_with("/inv_1"));

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].external_id, format!("booking-{id}"));
    assert_eq!(requests[0].amount, 3360);
    assert_eq!(requests[0].currency, "PHP");

    let notification = json!({
        "id": "inv_1",
        "external_id": format!("booking-{id}"),
        "status": "PAID",
        "amount": 3360,
    });
    let (status, body) = h.webhook(notification.clone(), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["payment_status"], "paid");
    assert_eq!(body["booking"]["payment_reference"], "inv_1");

    // redelivery changes nothing
    let (status, _) = h.webhook(notification, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (_, events) = send(
        &h.router,
        Method::GET,
        &format!("/api/bookings/{id}/events"),
        None,
        &[],
    )
    .await;
    assert_eq!(events.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_second_paid_invoice_keeps_first_payment() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    let paid = |invoice: &str| {
        json!({ "id": invoice, "external_id": format!("booking-{id}"), "status": "PAID" })
    };

    let (status, _) = h.webhook(paid("inv_1"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = h.webhook(paid("inv_2"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["payment_reference"], "inv_1");
}

#[tokio::test]
async fn test_expired_webhook_cancels_and_frees_dates() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;

    let (status, _) = h
        .webhook(
            json!({ "id": "inv_1", "external_id": format!("booking-{id}"), "status": "EXPIRED" }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "cancelled");

    let (status, _) = h.create("2025-03-01", "2025-03-04", 2).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_payment_for_unknown_or_confirmed_booking() {
    let h = harness();

    let (status, _) = send(
        &h.router,
        Method::POST,
        "/api/payments",
        Some(json!({ "booking_id": "00000000-0000-4000-8000-000000000000" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    h.webhook(
        json!({ "id": "inv_9", "external_id": format!("booking-{id}"), "status": "PAID" }),
        &[],
    )
    .await;

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/payments",
        Some(json!({ "booking_id": id })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");
    assert!(h.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_gateway_failure_is_reported() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    h.gateway.fail_next(GatewayError::Unauthorized);

    let (status, body) = send(
        &h.router,
        Method::POST,
        "/api/payments",
        Some(json!({ "booking_id": id })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "PAYMENT_GATEWAY_ERROR");

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["payment_reference"], Value::Null);
}

#[tokio::test]
async fn test_webhook_acknowledges_unusable_notifications() {
    let h = harness();

    let (status, body) = h
        .webhook(json!({ "external_id": "order-42", "status": "PAID" }), &[])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let (status, _) = h
        .webhook(
            json!({
                "id": "inv_1",
                "external_id": "booking-00000000-0000-4000-8000-000000000000",
                "status": "PAID",
            }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h.webhook(json!({ "status": "PAID" }), &[]).await;
    assert_eq!(status, StatusCode::OK);

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/webhooks/xendit")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_callback_token() {
    let h = harness_with(&[("XENDIT_CALLBACK_TOKEN", "cb_secret")]);
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    let notification =
        json!({ "id": "inv_1", "external_id": format!("booking-{id}"), "status": "PAID" });

    let (status, body) = h.webhook(notification.clone(), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = h
        .webhook(notification.clone(), &[("x-callback-token", "wrong")])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "pending");

    let (status, _) = h
        .webhook(notification, &[("x-callback-token", "cb_secret")])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "confirmed");
}

#[tokio::test]
async fn test_webhook_storage_failure_asks_for_redelivery() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    let notification =
        json!({ "id": "inv_1", "external_id": format!("booking-{id}"), "status": "PAID" });

    h.store.fail_next_writes(1);
    let (status, body) = h.webhook(notification.clone(), &[]).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");

    let (status, _) = h.webhook(notification, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = h.booking(&id).await;
    assert_eq!(body["booking"]["status"], "confirmed");
}

#[tokio::test]
async fn test_complete_past_stay() {
    let h = harness();
    let id = h.create_booking_id("2025-03-01", "2025-03-04").await;
    let uri = format!("/api/bookings/{id}/complete");

    let (status, body) = send(&h.router, Method::POST, &uri, None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");

    h.webhook(
        json!({ "id": "inv_1", "external_id": format!("booking-{id}"), "status": "PAID" }),
        &[],
    )
    .await;

    let (status, body) = send(&h.router, Method::POST, &uri, None, &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["booking"]["status"], "completed");
    assert_eq!(body["booking"]["payment_status"], "paid");
}

#[tokio::test]
async fn test_property_and_quote() {
    let h = harness();
    let base = format!("/api/properties/{}", h.property.id);

    let (status, body) = send(&h.router, Method::GET, &base, None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_guests"], 4);

    let quote_uri = format!("{base}/quote?check_in=2025-03-01&check_out=2025-03-04");
    let (status, body) = send(&h.router, Method::GET, &quote_uri, None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nights"], 3);
    assert_eq!(body["subtotal"], 3000);
    assert_eq!(body["commission"], 360);
    assert_eq!(body["total"], 3360);
    assert_eq!(body["available"], true);

    h.create_booking_id("2025-03-02", "2025-03-03").await;
    let (_, body) = send(&h.router, Method::GET, &quote_uri, None, &[]).await;
    assert_eq!(body["available"], false);

    let bad = format!("{base}/quote?check_in=2025-03-04&check_out=2025-03-01");
    let (status, body) = send(&h.router, Method::GET, &bad, None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DATE_RANGE");

    let (status, _) = send(
        &h.router,
        Method::GET,
        "/api/properties/00000000-0000-4000-8000-000000000000",
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let h = harness();

    let (status, body) = send(&h.router, Method::GET, "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&h.router, Method::GET, "/ready", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_responses_carry_correlation_id() {
    let h = harness();

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-correlation-id", "6f9619ff-8b86-4011-b42d-00cf4fc964ff")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "6f9619ff-8b86-4011-b42d-00cf4fc964ff"
    );
}

#[tokio::test]
async fn test_in_memory_app_serves_demo_listings() {
    let config = Config::from_lookup(|key| (key == "USE_IN_MEMORY_STORE").then(|| "true".to_string()));
    let app = SurfStayApp::new(&config).await.unwrap();

    for property in surfstay_server::app::demo_properties() {
        let (status, body) = send(
            &app.router(),
            Method::GET,
            &format!("/api/properties/{}", property.id),
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], property.name.as_str());
    }
}
