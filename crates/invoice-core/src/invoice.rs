//! Invoice Records
//!
//! The invoice model and the keys used to reconcile payments against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvoiceError, Result};

/// Opaque invoice identifier (UUIDv4, hyphenated)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an identifier received from a form or a stored row
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment state. Only ever moves from `Unpaid` to `Paid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Paid,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }

    /// Parse the stored representation
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            other => Err(InvoiceError::Storage(format!("unknown invoice status '{other}'"))),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,

    /// Recipient of the payment link
    pub customer_email: String,

    /// Amount in cents (USD)
    pub amount_cents: i64,

    pub status: InvoiceStatus,

    /// Checkout session currently backing the payment link
    pub session_ref: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set once, when the invoice is first marked paid
    pub paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create a new unpaid invoice
    pub fn new(id: InvoiceId, customer_email: String, amount_cents: i64) -> Self {
        Self {
            id,
            customer_email,
            amount_cents,
            status: InvoiceStatus::Unpaid,
            session_ref: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    /// Attach the checkout session reference
    #[must_use]
    pub fn with_session(mut self, session_ref: impl Into<String>) -> Self {
        self.session_ref = Some(session_ref.into());
        self
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Flip to paid. Returns false if the invoice was already paid.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid() {
            return false;
        }
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(Utc::now());
        true
    }

    /// Human-readable amount, e.g. `$50.00`
    pub fn display_amount(&self) -> String {
        format_cents(self.amount_cents)
    }
}

/// Format a cent amount as dollars
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Key used to locate an invoice when recording a payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentRef {
    /// Checkout session id reported by the payment provider
    Session(String),

    /// Invoice id
    Invoice(InvoiceId),
}

impl std::fmt::Display for PaymentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session(id) => write!(f, "session {id}"),
            Self::Invoice(id) => write!(f, "invoice {id}"),
        }
    }
}

/// Outcome of a successful mark-paid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkPaid {
    /// Status flipped from unpaid to paid
    Updated,

    /// Invoice was already paid; nothing changed
    AlreadyPaid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_invoice_is_unpaid() {
        let invoice = Invoice::new(InvoiceId::generate(), "a@b.com".into(), 5000);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.session_ref.is_none());
        assert!(invoice.paid_at.is_none());
    }

    #[test]
    fn test_mark_paid_once() {
        let mut invoice = Invoice::new(InvoiceId::generate(), "a@b.com".into(), 5000);
        assert!(invoice.mark_paid());
        let paid_at = invoice.paid_at;
        assert!(!invoice.mark_paid());
        assert_eq!(invoice.paid_at, paid_at);
        assert!(invoice.is_paid());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&InvoiceStatus::Unpaid).unwrap();
        assert_eq!(json, "\"unpaid\"");
        assert_eq!(InvoiceStatus::parse("paid").unwrap(), InvoiceStatus::Paid);
        assert!(InvoiceStatus::parse("refunded").is_err());
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "$50.00");
        assert_eq!(format_cents(1), "$0.01");
        assert_eq!(format_cents(123_456), "$1234.56");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(InvoiceId::generate(), InvoiceId::generate());
    }
}
