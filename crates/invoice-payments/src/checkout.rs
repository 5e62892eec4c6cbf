//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: each invoice gets a
//! one-off `payment` mode session with a single ad-hoc line item.

use std::collections::HashMap;

use async_trait::async_trait;
use invoice_core::{CheckoutGateway, CheckoutRequest, CheckoutSession};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode,
    CheckoutSessionStatus, Client, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    Currency,
};

use crate::error::{PaymentError, Result};

/// Metadata key carrying the invoice id on every session
pub const INVOICE_ID_METADATA: &str = "invoice_id";

/// Stripe client wrapper
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create a Stripe Checkout session (Hosted approach)
    ///
    /// Returns the session id and the URL of Stripe's hosted checkout page.
    pub async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut params = CreateCheckoutSession::new();
        params.customer_email = Some(&request.customer_email);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);

        let mut metadata = HashMap::new();
        metadata.insert(
            INVOICE_ID_METADATA.to_string(),
            request.invoice_id.as_str().to_string(),
        );
        params.metadata = Some(metadata);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.amount_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.description.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::debug!(
            session_id = %session.id,
            invoice_id = %request.invoice_id,
            "Opened Stripe checkout session"
        );

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    /// URL of an existing session while it is still open
    pub async fn open_session_url(&self, session_id: &str) -> Result<Option<String>> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|e| PaymentError::Stripe(format!("invalid session id '{session_id}': {e}")))?;

        let session = StripeCheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        if session.status != Some(CheckoutSessionStatus::Open) {
            return Ok(None);
        }
        Ok(session.url)
    }
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    async fn open_session(&self, request: &CheckoutRequest) -> invoice_core::Result<CheckoutSession> {
        Ok(self.create_checkout_session(request).await?)
    }

    async fn session_url(&self, session_id: &str) -> invoice_core::Result<Option<String>> {
        Ok(self.open_session_url(session_id).await?)
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_core::InvoiceError;

    #[test]
    fn test_stripe_errors_become_gateway_errors() {
        let err: InvoiceError = PaymentError::Stripe("card_declined".into()).into();
        assert!(matches!(err, InvoiceError::Gateway(msg) if msg.contains("card_declined")));
    }

    #[tokio::test]
    async fn test_malformed_session_id_rejected_before_network() {
        let gateway = StripeGateway::new("sk_test_placeholder");
        let err = gateway.open_session_url("not-a-session").await.unwrap_err();
        assert!(matches!(err, PaymentError::Stripe(msg) if msg.contains("invalid session id")));
    }
}
