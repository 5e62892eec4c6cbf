//! Application State

use std::sync::Arc;

use invoice_core::InvoiceService;
use invoice_payments::{WebhookHandler, WebhookVerifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Invoice lifecycle coordinator
    pub service: Arc<InvoiceService>,

    /// Checks `Stripe-Signature` on incoming webhooks
    pub verifier: Arc<WebhookVerifier>,

    /// Applies verified webhook events to invoices
    pub webhooks: Arc<WebhookHandler>,
}

impl AppState {
    pub fn new(service: Arc<InvoiceService>, verifier: WebhookVerifier) -> Self {
        Self {
            webhooks: Arc::new(WebhookHandler::new(service.clone())),
            verifier: Arc::new(verifier),
            service,
        }
    }
}
