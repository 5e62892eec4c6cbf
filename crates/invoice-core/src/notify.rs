//! Customer Notifications

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invoice::format_cents;

/// Why the customer is being emailed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// First email, sent on creation
    Invoice,

    /// Merchant-triggered resend
    Reminder,
}

/// A payment-link email
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub kind: NotificationKind,
    pub amount_cents: i64,
    pub payment_url: String,
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self.kind {
            NotificationKind::Invoice => "Your Invoice",
            NotificationKind::Reminder => "Reminder: Your Invoice",
        }
    }

    /// Plain-text body
    pub fn body(&self) -> String {
        let amount = format_cents(self.amount_cents);
        match self.kind {
            NotificationKind::Invoice => format!(
                "Hello! You have a new invoice for {amount}.\n\nPlease pay your invoice here: {}\n",
                self.payment_url
            ),
            NotificationKind::Reminder => format!(
                "Hello! This is a friendly reminder that your invoice for {amount} is still unpaid.\n\n\
                 You can pay it here: {}\n",
                self.payment_url
            ),
        }
    }
}

/// Notification delivery trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the notification
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Transport name for logs
    fn name(&self) -> &str;
}
