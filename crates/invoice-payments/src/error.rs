//! Payment Error Types

use invoice_core::InvoiceError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature missing, malformed, stale or wrong
    #[error("Webhook signature invalid: {0}")]
    InvalidSignature(String),

    /// Webhook body could not be decoded
    #[error("Webhook payload invalid: {0}")]
    InvalidPayload(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Applying a verified event to the invoice store failed
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
}

impl PaymentError {
    /// Stable code for API responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Stripe(_) => "STRIPE_ERROR",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Invoice(_) => "WEBHOOK_ERROR",
        }
    }
}

impl From<PaymentError> for InvoiceError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Invoice(inner) => inner,
            PaymentError::Config(msg) => Self::Config(msg),
            other => Self::Gateway(other.to_string()),
        }
    }
}
