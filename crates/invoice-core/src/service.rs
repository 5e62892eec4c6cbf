//! Invoice Lifecycle
//!
//! `InvoiceService` coordinates the store, the checkout gateway and the
//! notifier. It is built once at startup and shared across requests.
//!
//! ## Payment reconciliation
//!
//! ```text
//! create ──▶ gateway.open_session ──▶ store.insert ──▶ spawn(notifier.send)
//!                                          │
//!  provider webhook ──▶ mark_paid(Session) ┘  (only authoritative writer)
//! ```
//!
//! The browser's success redirect is client-controlled, so it only reads state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::{InvoiceError, Result};
use crate::gateway::{CheckoutGateway, CheckoutRequest, CheckoutSession};
use crate::invoice::{Invoice, InvoiceId, MarkPaid, PaymentRef};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::store::InvoiceStore;

/// Coordinator configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Externally reachable origin used to build redirect URLs
    pub base_url: String,

    /// Line-item name on the checkout page
    pub description: String,

    /// Upper bound for each gateway call
    pub gateway_timeout: Duration,

    /// Upper bound for each email send
    pub notify_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            description: "Invoice Payment".into(),
            gateway_timeout: Duration::from_secs(15),
            notify_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceConfig {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Stripe substitutes `{CHECKOUT_SESSION_ID}` when redirecting
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.base())
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/cancel", self.base())
    }
}

/// Whether the payment email went out
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

/// Result of creating an invoice
#[derive(Debug)]
pub struct CreatedInvoice {
    pub invoice: Invoice,
    pub payment_url: String,

    /// Background send of the payment email. Dropping it detaches the task.
    pub delivery: JoinHandle<Delivery>,
}

/// Result of sending a reminder
#[derive(Clone, Debug)]
pub struct ReminderSent {
    pub invoice: Invoice,
    pub payment_url: String,
}

/// Invoice lifecycle coordinator
pub struct InvoiceService {
    store: Arc<dyn InvoiceStore>,
    gateway: Arc<dyn CheckoutGateway>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        gateway: Arc<dyn CheckoutGateway>,
        notifier: Arc<dyn Notifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Create an invoice, open its checkout session and email the link.
    ///
    /// Gateway failures abort before anything is stored. The email is sent in
    /// the background once the invoice is stored; a failure or timeout is
    /// logged and never affects the invoice.
    pub async fn create(&self, email: &str, amount: &str) -> Result<CreatedInvoice> {
        let customer_email = validate_email(email)?;
        let amount_cents = parse_amount(amount)?;

        let id = InvoiceId::generate();
        let session = self.open_session(&id, &customer_email, amount_cents).await?;

        let invoice = Invoice::new(id, customer_email, amount_cents).with_session(&session.id);
        self.store.insert(&invoice).await?;

        tracing::info!(
            invoice_id = %invoice.id,
            session_id = %session.id,
            email = %invoice.customer_email,
            amount_cents,
            "Created invoice"
        );

        let delivery = tokio::spawn(deliver(
            self.notifier.clone(),
            self.config.notify_timeout,
            Notification {
                to: invoice.customer_email.clone(),
                kind: NotificationKind::Invoice,
                amount_cents,
                payment_url: session.url.clone(),
            },
        ));

        Ok(CreatedInvoice {
            invoice,
            payment_url: session.url,
            delivery,
        })
    }

    /// Record a payment. Re-applying it to a paid invoice is a no-op.
    pub async fn mark_paid(&self, reference: &PaymentRef) -> Result<MarkPaid> {
        match self.store.mark_paid(reference).await? {
            Some(MarkPaid::Updated) => {
                tracing::info!(reference = %reference, "Invoice marked paid");
                Ok(MarkPaid::Updated)
            }
            Some(MarkPaid::AlreadyPaid) => {
                tracing::debug!(reference = %reference, "Invoice was already paid");
                Ok(MarkPaid::AlreadyPaid)
            }
            None => Err(InvoiceError::NotFound(reference.to_string())),
        }
    }

    /// All invoices, most recently created first
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        self.store.list().await
    }

    pub async fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| InvoiceError::NotFound(id.to_string()))
    }

    pub async fn find_by_session(&self, session_ref: &str) -> Result<Option<Invoice>> {
        self.store.find_by_session(session_ref).await
    }

    /// Payment URL for an unpaid invoice, reopening the session if it lapsed
    pub async fn payment_link(&self, id: &InvoiceId) -> Result<String> {
        let mut invoice = self.unpaid_invoice(id).await?;
        self.resolve_payment_url(&mut invoice).await
    }

    /// Re-send the payment link for an unpaid invoice
    pub async fn send_reminder(&self, id: &InvoiceId) -> Result<ReminderSent> {
        let mut invoice = self.unpaid_invoice(id).await?;
        let payment_url = self.resolve_payment_url(&mut invoice).await?;

        let notification = Notification {
            to: invoice.customer_email.clone(),
            kind: NotificationKind::Reminder,
            amount_cents: invoice.amount_cents,
            payment_url: payment_url.clone(),
        };

        match tokio::time::timeout(self.config.notify_timeout, self.notifier.send(&notification))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(InvoiceError::Notification(format!(
                    "{} timed out after {:?}",
                    self.notifier.name(),
                    self.config.notify_timeout
                )));
            }
        }

        tracing::info!(
            invoice_id = %invoice.id,
            email = %invoice.customer_email,
            "Sent payment reminder"
        );

        Ok(ReminderSent {
            invoice,
            payment_url,
        })
    }

    async fn unpaid_invoice(&self, id: &InvoiceId) -> Result<Invoice> {
        let invoice = self.get_invoice(id).await?;
        if invoice.is_paid() {
            return Err(InvoiceError::AlreadyPaid(id.to_string()));
        }
        Ok(invoice)
    }

    async fn resolve_payment_url(&self, invoice: &mut Invoice) -> Result<String> {
        if let Some(session_ref) = &invoice.session_ref {
            let existing = self
                .bounded(self.gateway.session_url(session_ref))
                .await?;
            if let Some(url) = existing {
                return Ok(url);
            }
            tracing::info!(
                invoice_id = %invoice.id,
                session_id = %session_ref,
                "Checkout session no longer open, opening a new one"
            );
        }

        let session = self
            .open_session(&invoice.id, &invoice.customer_email, invoice.amount_cents)
            .await?;

        if !self.store.replace_session(&invoice.id, &session.id).await? {
            return Err(InvoiceError::NotFound(invoice.id.to_string()));
        }
        invoice.session_ref = Some(session.id);

        Ok(session.url)
    }

    async fn open_session(
        &self,
        id: &InvoiceId,
        email: &str,
        amount_cents: i64,
    ) -> Result<CheckoutSession> {
        let request = CheckoutRequest {
            invoice_id: id.clone(),
            amount_cents,
            description: self.config.description.clone(),
            customer_email: email.to_string(),
            success_url: self.config.success_url(),
            cancel_url: self.config.cancel_url(),
        };

        self.bounded(self.gateway.open_session(&request)).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.gateway_timeout, call)
            .await
            .map_err(|_| {
                InvoiceError::Gateway(format!(
                    "{} timed out after {:?}",
                    self.gateway.name(),
                    self.config.gateway_timeout
                ))
            })?
    }
}

async fn deliver(
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    notification: Notification,
) -> Delivery {
    let sent = tokio::time::timeout(timeout, notifier.send(&notification)).await;

    let reason = match sent {
        Ok(Ok(())) => return Delivery::Sent,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {timeout:?}"),
    };

    tracing::warn!(
        email = %notification.to,
        notifier = notifier.name(),
        reason = %reason,
        "Invoice email not delivered, payment link still valid"
    );
    Delivery::Failed(reason)
}

/// Amount must be a positive whole number of cents
pub fn parse_amount(raw: &str) -> Result<i64> {
    let amount: i64 = raw.trim().parse().map_err(|_| {
        InvoiceError::Validation(format!("amount '{}' is not a whole number of cents", raw.trim()))
    })?;

    if amount <= 0 {
        return Err(InvoiceError::Validation("amount must be greater than zero".into()));
    }
    Ok(amount)
}

/// Email must be present. Format is left to the mail relay.
pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(InvoiceError::Validation("email is required".into()));
    }
    Ok(email.to_string())
}
