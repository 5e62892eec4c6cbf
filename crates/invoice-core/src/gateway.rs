//! Checkout Gateway
//!
//! Hosted checkout sessions are created by an external payment provider. The
//! coordinator only needs a session id to reconcile against and a URL to send
//! the customer to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invoice::InvoiceId;

/// Request to open a hosted checkout session for one invoice
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Invoice being paid, recorded in session metadata
    pub invoice_id: InvoiceId,

    /// Amount in cents (USD)
    pub amount_cents: i64,

    /// Line-item name shown on the checkout page
    pub description: String,

    /// Prefills the checkout form
    pub customer_email: String,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,
}

/// An open checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session id
    pub id: String,

    /// URL to redirect the customer to
    pub url: String,
}

/// Checkout gateway trait (Strategy pattern)
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Open a new checkout session
    async fn open_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Payment URL of an existing session, or `None` once it is no longer open
    async fn session_url(&self, session_id: &str) -> Result<Option<String>>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
