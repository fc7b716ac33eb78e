//! Scriptable payment gateway.

use std::collections::VecDeque;
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use surfstay_core::GatewayError;
use surfstay_core::payment::{GatewayFuture, Invoice, InvoiceRequest, PaymentGateway};

/// What the mock does with the next request
#[derive(Clone, Debug)]
pub enum GatewayBehavior {
    /// Return an invoice with a generated id
    Succeed,
    /// Return this error
    Fail(GatewayError),
}

#[derive(Default)]
struct State {
    script: VecDeque<GatewayBehavior>,
    requests: Vec<InvoiceRequest>,
}

/// Payment gateway that records requests and follows a script.
///
/// With an empty script every request succeeds with invoice id
/// `inv_{n}`, counting from 1.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<Mutex<State>>,
}

impl MockPaymentGateway {
    /// Creates a gateway that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }

    /// Queues the behaviour for the next request
    pub fn push(&self, behavior: GatewayBehavior) {
        self.lock().script.push_back(behavior);
    }

    /// Makes the next request fail with `error`
    pub fn fail_next(&self, error: GatewayError) {
        self.push(GatewayBehavior::Fail(error));
    }

    /// Every request received, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<InvoiceRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_invoice(&self, request: InvoiceRequest) -> GatewayFuture<'_, Invoice> {
        let mut state = self.lock();
        state.requests.push(request);
        let behavior = state.script.pop_front().unwrap_or(GatewayBehavior::Succeed);

        let result = match behavior {
            GatewayBehavior::Succeed => {
                let id = format!("inv_{}", state.requests.len());
                Ok(Invoice {
                    invoice_url: format!("https://checkout.example.test/web/{id}"),
                    id,
                    status: Some("PENDING".to_string()),
                })
            }
            GatewayBehavior::Fail(error) => Err(error),
        };
        Box::pin(ready(result))
    }
}
