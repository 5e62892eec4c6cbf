//! Error Types

use thiserror::Error;

/// Result type alias for invoice operations
pub type Result<T> = std::result::Result<T, InvoiceError>;

/// Invoice error types
#[derive(Error, Debug)]
pub enum InvoiceError {
    /// Form input rejected (bad amount, missing email)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Checkout session could not be created or retrieved
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Email could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// No invoice matches the given identifier or session
    #[error("Invoice not found: {0}")]
    NotFound(String),

    /// Operation only applies to unpaid invoices
    #[error("Invoice already paid: {0}")]
    AlreadyPaid(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl InvoiceError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(_) | Self::Notification(_) | Self::Storage(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Please check the form: {msg}"),
            Self::Gateway(_) => "The payment provider is unavailable. Please try again.".into(),
            Self::Notification(_) => "The email could not be sent. Please try again later.".into(),
            Self::NotFound(_) => "That invoice does not exist.".into(),
            Self::AlreadyPaid(_) => "That invoice has already been paid.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(InvoiceError::Gateway("timeout".into()).is_retryable());
        assert!(!InvoiceError::NotFound("inv".into()).is_retryable());
        assert!(!InvoiceError::Validation("amount".into()).is_retryable());
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = InvoiceError::Storage("database is locked".into());
        assert!(!err.user_message().contains("locked"));
    }

    #[test]
    fn test_user_message_keeps_validation_detail() {
        let err = InvoiceError::Validation("amount must be positive".into());
        assert!(err.user_message().contains("amount must be positive"));
    }
}
