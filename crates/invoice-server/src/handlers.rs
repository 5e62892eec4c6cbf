//! HTTP Handlers

use axum::{
    Form, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, Redirect},
};
use invoice_core::{InvoiceError, InvoiceId};
use invoice_payments::{PaymentError, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pages;
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Missing fields deserialize as empty so they surface as validation errors.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ReminderForm {
    #[serde(default)]
    pub invoice_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Invoice creation form
pub async fn index() -> Html<String> {
    Html(pages::create_form())
}

/// Create an invoice and email its payment link
pub async fn create_invoice(
    State(state): State<AppState>,
    Form(form): Form<CreateInvoiceForm>,
) -> Result<Html<String>, AppError> {
    let created = state.service.create(&form.email, &form.amount).await?;
    Ok(Html(pages::invoice_created(&created)))
}

/// All invoices, newest first
pub async fn list_invoices(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let invoices = state.service.list_invoices().await?;
    Ok(Html(pages::invoice_list(&invoices)))
}

/// Re-send the payment link for an unpaid invoice
pub async fn send_reminder(
    State(state): State<AppState>,
    Form(form): Form<ReminderForm>,
) -> Result<Html<String>, AppError> {
    let invoice_id = form.invoice_id.trim();
    if invoice_id.is_empty() {
        return Err(InvoiceError::Validation("invoice_id is required".into()).into());
    }

    let reminder = state
        .service
        .send_reminder(&InvoiceId::from_string(invoice_id))
        .await?;
    Ok(Html(pages::reminder_sent(&reminder)))
}

/// Send the customer to the invoice's checkout page
pub async fn pay(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Redirect, AppError> {
    let url = state
        .service
        .payment_link(&InvoiceId::from_string(invoice_id))
        .await?;
    Ok(Redirect::to(&url))
}

/// Landing page after checkout. Read-only: the webhook records payments.
pub async fn success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Result<Html<String>, AppError> {
    let invoice = match query.session_id.as_deref() {
        Some(session_id) if !session_id.is_empty() => {
            state.service.find_by_session(session_id).await?
        }
        _ => None,
    };
    Ok(Html(pages::success(invoice.as_ref())))
}

/// Landing page when the customer abandons checkout
pub async fn cancel() -> Html<String> {
    Html(pages::cancel())
}

fn webhook_error(status: StatusCode, err: &PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().into(),
        }),
    )
}

/// Stripe webhook handler
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            webhook_error(
                StatusCode::BAD_REQUEST,
                &PaymentError::InvalidSignature("missing Stripe-Signature header".into()),
            )
        })?;

    let event = state.verifier.parse_event(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, code = e.code(), "Webhook rejected");
        webhook_error(StatusCode::BAD_REQUEST, &e)
    })?;

    state.webhooks.handle(event).await.map_err(|e| {
        tracing::error!(error = %e, "Webhook processing failed");
        webhook_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
    })?;

    Ok(StatusCode::OK)
}
