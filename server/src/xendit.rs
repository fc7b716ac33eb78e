//! Xendit invoice API client.
//!
//! Implements [`PaymentGateway`] over `POST {api_url}/v2/invoices` with the
//! secret key as the Basic auth user name and an empty password.

use crate::config::XenditConfig;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use surfstay_core::GatewayError;
use surfstay_core::payment::{GatewayFuture, Invoice, InvoiceRequest, PaymentGateway};

/// Xendit API client
#[derive(Clone)]
pub struct XenditGateway {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl XenditGateway {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &XenditConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn post_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError> {
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/v2/invoices", self.api_url))
            .basic_auth(&self.secret_key, Some(""))
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        metrics::histogram!("surfstay_gateway_request_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match response.status() {
            status if status.is_success() => {
                let invoice = response
                    .json::<Invoice>()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                tracing::info!(
                    invoice_id = %invoice.id,
                    external_id = %request.external_id,
                    "Invoice created"
                );
                Ok(invoice)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::error!("Xendit rejected the API key");
                Err(GatewayError::Unauthorized)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), body = %body, "Invoice request rejected");
                Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

impl PaymentGateway for XenditGateway {
    fn create_invoice(&self, request: InvoiceRequest) -> GatewayFuture<'_, Invoice> {
        Box::pin(self.post_invoice(request))
    }
}
