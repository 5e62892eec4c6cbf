//! # invoice-store
//!
//! SQLite persistence for invoices via sqlx.
//!
//! ```rust,ignore
//! use invoice_store::SqliteInvoiceStore;
//!
//! let store = SqliteInvoiceStore::connect("sqlite://invoices.db").await?;
//! ```
//!
//! Migrations under `migrations/` are embedded at compile time and applied on
//! connect.

mod sqlite;

pub use sqlite::SqliteInvoiceStore;
