//! # invoice-server
//!
//! Axum HTTP surface for invoice-desk: the merchant pages, the customer
//! landing pages, and the Stripe webhook.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use state::AppState;

use crate::handlers::{
    cancel, create_invoice, health_check, index, list_invoices, pay, send_reminder, success,
    webhook,
};

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Merchant
        .route("/", get(index))
        .route("/create_invoice", post(create_invoice))
        .route("/invoices", get(list_invoices))
        .route("/send_reminder", post(send_reminder))
        // Customer
        .route("/pay/{invoice_id}", get(pay))
        .route("/success", get(success))
        .route("/cancel", get(cancel))
        // Payment provider
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
