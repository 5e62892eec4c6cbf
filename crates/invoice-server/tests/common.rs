// This is imported by different tests that use different functions.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, request};
use axum::response::Response;
use invoice_core::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, InvoiceService, MemoryInvoiceStore,
    Notification, Notifier, Result, ServiceConfig,
};
use invoice_payments::WebhookVerifier;
use invoice_server::AppState;

pub const WEBHOOK_SECRET: &str = "whsec_route_tests";

#[derive(Default)]
pub struct FakeGateway {
    opened: AtomicUsize,
}

#[async_trait]
impl CheckoutGateway for FakeGateway {
    async fn open_session(&self, _request: &CheckoutRequest) -> Result<CheckoutSession> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            id: format!("cs_test_{n}"),
            url: format!("https://checkout.example/cs_test_{n}"),
        })
    }

    async fn session_url(&self, session_id: &str) -> Result<Option<String>> {
        Ok(Some(format!("https://checkout.example/{session_id}")))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Invoice emails go out in the background; wait until `count` have landed.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {count} emails, got {}", self.sent().len()))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: WebhookVerifier,
}

impl TestApp {
    pub fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(InvoiceService::new(
            Arc::new(MemoryInvoiceStore::new()),
            Arc::new(FakeGateway::default()),
            notifier.clone(),
            ServiceConfig {
                base_url: "http://invoices.test".into(),
                ..Default::default()
            },
        ));

        Self {
            state: AppState::new(service, WebhookVerifier::new(WEBHOOK_SECRET)),
            notifier,
            verifier: WebhookVerifier::new(WEBHOOK_SECRET),
        }
    }

    pub fn router(&self) -> axum::Router {
        invoice_server::app(self.state.clone())
    }
}

pub trait RequestBuilderExt {
    fn form(self, body: &str) -> Request<Body>;

    fn empty_body(self) -> Request<Body>;
}

impl RequestBuilderExt for request::Builder {
    fn form(self, body: &str) -> Request<Body> {
        self.header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("failed to build request")
    }

    fn empty_body(self) -> Request<Body> {
        self.body(Body::empty()).expect("failed to build request")
    }
}

pub async fn response_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&response_text(resp).await).expect("failed to read response body as json")
}

pub async fn response_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("error reading response body");
    String::from_utf8(bytes.to_vec()).expect("response body is not UTF-8")
}

/// A `checkout.session.completed` event for `session_id`
pub fn completed_event(session_id: &str, invoice_id: &str) -> Vec<u8> {
    serde_json::json!({
        "id": "evt_route_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "metadata": { "invoice_id": invoice_id }
            }
        }
    })
    .to_string()
    .into_bytes()
}
