//! HTML error responses

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use invoice_core::InvoiceError;

use crate::pages;

/// Handler error, rendered as an HTML page
#[derive(Debug)]
pub struct AppError(pub InvoiceError);

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub const fn status_code(&self) -> StatusCode {
        match &self.0 {
            InvoiceError::Validation(_) => StatusCode::BAD_REQUEST,
            InvoiceError::NotFound(_) => StatusCode::NOT_FOUND,
            InvoiceError::AlreadyPaid(_) => StatusCode::CONFLICT,
            InvoiceError::Gateway(_) | InvoiceError::Notification(_) => StatusCode::BAD_GATEWAY,
            InvoiceError::Storage(_) | InvoiceError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::warn!(error = %self.0, "Request rejected");
        }

        (status, Html(pages::error_page(status, &self.0.user_message()))).into_response()
    }
}
