//! # invoice-core
//!
//! Invoice model and lifecycle coordination for invoice-desk.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      InvoiceService                         │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌───────────────┐  │
//! │  │ InvoiceStore │  │ CheckoutGateway │  │   Notifier    │  │
//! │  │  (SQLite)    │  │    (Stripe)     │  │    (SMTP)     │  │
//! │  └──────────────┘  └─────────────────┘  └───────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each collaborator is a trait so the coordinator can run against in-memory
//! fakes in tests and against real services in production.

pub mod error;
pub mod gateway;
pub mod invoice;
pub mod notify;
pub mod service;
pub mod store;

pub use error::{InvoiceError, Result};
pub use gateway::{CheckoutGateway, CheckoutRequest, CheckoutSession};
pub use invoice::{Invoice, InvoiceId, InvoiceStatus, MarkPaid, PaymentRef, format_cents};
pub use notify::{Notification, NotificationKind, Notifier};
pub use service::{CreatedInvoice, Delivery, InvoiceService, ReminderSent, ServiceConfig};
pub use store::{InvoiceStore, MemoryInvoiceStore};
