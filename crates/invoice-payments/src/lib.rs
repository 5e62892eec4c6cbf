//! # invoice-payments
//!
//! Stripe integration for invoice-desk.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │  Merchant   │────▶│  Stripe Hosted  │────▶│  /success   │
//! │  (invoice)  │     │  Checkout Page  │     │ (read-only) │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//!                              │
//!                              ▼
//!                     ┌─────────────────┐
//!                     │ POST /webhook   │──▶ invoice marked paid
//!                     └─────────────────┘
//! ```
//!
//! The redirect back to `/success` is controlled by the customer's browser,
//! so only the signed webhook is trusted to record a payment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use invoice_payments::{StripeGateway, WebhookVerifier, WebhookHandler};
//!
//! let gateway = StripeGateway::new("sk_test_xxx");
//! let verifier = WebhookVerifier::new("whsec_xxx");
//!
//! // In the webhook endpoint:
//! let event = verifier.parse_event(&body, signature)?;
//! WebhookHandler::new(service).handle(event).await?;
//! ```

mod checkout;
mod error;
mod webhook;

pub use checkout::{INVOICE_ID_METADATA, StripeGateway};
pub use error::{PaymentError, Result};
pub use webhook::{SIGNATURE_HEADER, WebhookEvent, WebhookHandler, WebhookVerifier, decode_event};
