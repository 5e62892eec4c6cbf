//! Stripe Webhook Handling
//!
//! Verifies the `Stripe-Signature` header and turns checkout events into
//! invoice payments. The webhook is the only path that marks invoices paid.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use invoice_core::{InvoiceError, InvoiceId, InvoiceService, MarkPaid, PaymentRef};
use serde::Deserialize;
use sha2::Sha256;

use crate::checkout::INVOICE_ID_METADATA;
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header Stripe puts the signature in
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed timestamp, in seconds
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Allowed clock skew for timestamps from the future, in seconds
const FUTURE_SKEW_SECS: i64 = 60;

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `checkout.session.completed`
    CheckoutCompleted {
        session_id: String,
        invoice_id: Option<String>,
        /// False for delayed payment methods that settle later
        paid: bool,
    },

    /// `checkout.session.async_payment_succeeded`
    AsyncPaymentSucceeded {
        session_id: String,
        invoice_id: Option<String>,
    },

    /// Unhandled event type
    Other { event_type: String },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

impl RawCheckoutSession {
    fn invoice_id(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(INVOICE_ID_METADATA))
            .cloned()
    }
}

/// Signature verifier for Stripe webhooks
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify the signature and decode the event
    pub fn parse_event(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        self.verify(payload, signature, chrono::Utc::now().timestamp())?;
        decode_event(payload)
    }

    /// Check `t=<unix>,v1=<hex>` against the payload at time `now`
    pub fn verify(&self, payload: &[u8], signature: &str, now: i64) -> Result<()> {
        let mut timestamp = None;
        let mut candidates = Vec::new();

        for part in signature.split(',') {
            if let Some(t) = part.trim().strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.trim().strip_prefix("v1=") {
                candidates.push(s);
            }
        }

        let timestamp_str = timestamp
            .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
        if candidates.is_empty() {
            return Err(PaymentError::InvalidSignature("missing v1 signature".into()));
        }

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| PaymentError::InvalidSignature("invalid timestamp".into()))?;

        let age = now - timestamp;
        if age > TIMESTAMP_TOLERANCE_SECS {
            return Err(PaymentError::InvalidSignature(format!(
                "timestamp too old ({age}s)"
            )));
        }
        if age < -FUTURE_SKEW_SECS {
            return Err(PaymentError::InvalidSignature("timestamp in the future".into()));
        }

        let mac = self.mac(timestamp_str, payload)?;

        // verify_slice compares in constant time
        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature("no matching signature".into()))
        }
    }

    /// Build a `Stripe-Signature` header value for `payload`.
    ///
    /// Useful for replaying events locally against the webhook endpoint.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let t = timestamp.to_string();
        let signature = hex::encode(self.mac(&t, payload)?.finalize().into_bytes());
        Ok(format!("t={t},v1={signature}"))
    }

    fn mac(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PaymentError::Config(format!("invalid webhook secret: {e}")))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// Decode a verified payload into our event type
pub fn decode_event(payload: &[u8]) -> Result<WebhookEvent> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;

    let session = |object: serde_json::Value| -> Result<RawCheckoutSession> {
        serde_json::from_value(object)
            .map_err(|e| PaymentError::InvalidPayload(format!("invalid checkout session data: {e}")))
    };

    match raw.event_type.as_str() {
        "checkout.session.completed" => {
            let s = session(raw.data.object)?;
            let paid = matches!(
                s.payment_status.as_deref(),
                Some("paid" | "no_payment_required")
            );
            Ok(WebhookEvent::CheckoutCompleted {
                invoice_id: s.invoice_id(),
                session_id: s.id,
                paid,
            })
        }

        "checkout.session.async_payment_succeeded" => {
            let s = session(raw.data.object)?;
            Ok(WebhookEvent::AsyncPaymentSucceeded {
                invoice_id: s.invoice_id(),
                session_id: s.id,
            })
        }

        _ => Ok(WebhookEvent::Other {
            event_type: raw.event_type,
        }),
    }
}

/// Applies verified webhook events to invoices
pub struct WebhookHandler {
    service: Arc<InvoiceService>,
}

impl WebhookHandler {
    pub const fn new(service: Arc<InvoiceService>) -> Self {
        Self { service }
    }

    /// Process a webhook event
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookEvent> {
        match &event {
            WebhookEvent::CheckoutCompleted {
                session_id,
                invoice_id,
                paid: true,
            }
            | WebhookEvent::AsyncPaymentSucceeded {
                session_id,
                invoice_id,
            } => {
                self.record_payment(session_id, invoice_id.as_deref()).await?;
            }

            WebhookEvent::CheckoutCompleted {
                session_id,
                paid: false,
                ..
            } => {
                tracing::info!(
                    session_id = %session_id,
                    "Checkout completed, payment still pending"
                );
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            }
        }

        Ok(event)
    }

    async fn record_payment(&self, session_id: &str, invoice_id: Option<&str>) -> Result<()> {
        let by_session = PaymentRef::Session(session_id.to_string());

        let mut outcome = self.service.mark_paid(&by_session).await;

        // The invoice may have moved to a newer session since this one was opened.
        if matches!(outcome, Err(InvoiceError::NotFound(_))) {
            if let Some(id) = invoice_id {
                let by_invoice = PaymentRef::Invoice(InvoiceId::from_string(id));
                outcome = self.service.mark_paid(&by_invoice).await;
            }
        }

        match outcome {
            Ok(MarkPaid::Updated) => {
                tracing::info!(session_id = %session_id, "Payment confirmed by webhook");
                Ok(())
            }
            Ok(MarkPaid::AlreadyPaid) => {
                tracing::debug!(session_id = %session_id, "Duplicate payment event ignored");
                Ok(())
            }
            Err(InvoiceError::NotFound(reference)) => {
                tracing::warn!(
                    session_id = %session_id,
                    reference = %reference,
                    "Payment event for unknown invoice acknowledged"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
