//! invoice-desk HTTP Server
//!
//! Creates invoices, emails Stripe Checkout links, and records payments
//! from verified Stripe webhooks.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use invoice_core::{InvoiceService, Notifier};
use invoice_mail::{LogNotifier, SmtpNotifier};
use invoice_payments::{StripeGateway, WebhookVerifier};
use invoice_server::{AppConfig, AppState, app};
use invoice_store::SqliteInvoiceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Storage
    let store = SqliteInvoiceStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    tracing::info!("✓ Database ready at {}", config.database_url);

    // Payments
    let gateway = StripeGateway::new(&config.stripe_secret_key);
    tracing::info!("✓ Stripe configured");

    // Email
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(smtp).context("invalid SMTP settings")?;
            tracing::info!("✓ SMTP relay {}:{}", smtp.host, smtp.port);
            Arc::new(notifier)
        }
        None => {
            tracing::warn!("⚠ Email not configured - invoices will be logged, not sent");
            tracing::warn!("  Set EMAIL_USER and EMAIL_PASS in .env");
            Arc::new(LogNotifier)
        }
    };

    let service = Arc::new(InvoiceService::new(
        Arc::new(store),
        Arc::new(gateway),
        notifier,
        config.service_config(),
    ));
    let state = AppState::new(service, WebhookVerifier::new(config.webhook_secret.clone()));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 invoice-desk running on http://{}", addr);
    tracing::info!("   Public URL: {}", config.base_url);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /               - Invoice form");
    tracing::info!("  POST /create_invoice - Create and send invoice");
    tracing::info!("  GET  /invoices       - List invoices");
    tracing::info!("  POST /send_reminder  - Re-send payment link");
    tracing::info!("  GET  /pay/{{id}}       - Redirect to checkout");
    tracing::info!("  GET  /success        - Checkout landing page");
    tracing::info!("  GET  /cancel         - Checkout cancelled");
    tracing::info!("  POST /webhook        - Stripe webhook");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler, run until the process is killed.
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
