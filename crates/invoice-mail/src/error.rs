//! Mail Error Types

use invoice_core::InvoiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl From<MailError> for InvoiceError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::MissingConfig(msg) => Self::Config(msg),
            other => Self::Notification(other.to_string()),
        }
    }
}
