//! Invoice Storage
//!
//! The store is the sole arbiter of invoice state. `mark_paid` must be a single
//! conditional update so concurrent webhook deliveries converge.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{InvoiceError, Result};
use crate::invoice::{Invoice, InvoiceId, MarkPaid, PaymentRef};

/// Invoice storage trait
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice. Fails if the id or session is already taken.
    async fn insert(&self, invoice: &Invoice) -> Result<()>;

    /// Get invoice by id
    async fn get(&self, id: &InvoiceId) -> Result<Option<Invoice>>;

    /// Get invoice by checkout session reference
    async fn find_by_session(&self, session_ref: &str) -> Result<Option<Invoice>>;

    /// All invoices, most recently created first
    async fn list(&self) -> Result<Vec<Invoice>>;

    /// Flip an unpaid invoice to paid. `None` when nothing matches.
    async fn mark_paid(&self, reference: &PaymentRef) -> Result<Option<MarkPaid>>;

    /// Point the invoice at a new checkout session. Returns false if the id is unknown.
    async fn replace_session(&self, id: &InvoiceId, session_ref: &str) -> Result<bool>;
}

/// In-memory invoice store (for tests and local development)
#[derive(Default)]
pub struct MemoryInvoiceStore {
    invoices: RwLock<Vec<Invoice>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(invoice: &Invoice, reference: &PaymentRef) -> bool {
    match reference {
        PaymentRef::Session(session) => invoice.session_ref.as_deref() == Some(session.as_str()),
        PaymentRef::Invoice(id) => &invoice.id == id,
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;

        if invoices.iter().any(|i| i.id == invoice.id) {
            return Err(InvoiceError::Storage(format!("duplicate invoice id {}", invoice.id)));
        }
        if let Some(session) = &invoice.session_ref {
            if invoices.iter().any(|i| i.session_ref.as_ref() == Some(session)) {
                return Err(InvoiceError::Storage(format!("duplicate session {session}")));
            }
        }

        invoices.push(invoice.clone());
        Ok(())
    }

    async fn get(&self, id: &InvoiceId) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.iter().find(|i| &i.id == id).cloned())
    }

    async fn find_by_session(&self, session_ref: &str) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .iter()
            .find(|i| i.session_ref.as_deref() == Some(session_ref))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Invoice>> {
        let invoices = self.invoices.read().await;
        // Reverse first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut listed: Vec<Invoice> = invoices.iter().rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn mark_paid(&self, reference: &PaymentRef) -> Result<Option<MarkPaid>> {
        let mut invoices = self.invoices.write().await;

        let Some(invoice) = invoices.iter_mut().find(|i| matches(i, reference)) else {
            return Ok(None);
        };

        if invoice.mark_paid() {
            Ok(Some(MarkPaid::Updated))
        } else {
            Ok(Some(MarkPaid::AlreadyPaid))
        }
    }

    async fn replace_session(&self, id: &InvoiceId, session_ref: &str) -> Result<bool> {
        let mut invoices = self.invoices.write().await;

        if invoices
            .iter()
            .any(|i| &i.id != id && i.session_ref.as_deref() == Some(session_ref))
        {
            return Err(InvoiceError::Storage(format!("duplicate session {session_ref}")));
        }

        match invoices.iter_mut().find(|i| &i.id == id) {
            Some(invoice) => {
                invoice.session_ref = Some(session_ref.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
