//! # invoice-mail
//!
//! Email delivery for invoice-desk, built on [lettre](https://lettre.rs).
//!
//! # Environment Variables
//!
//! [`SmtpConfig::from_lookup`] reads:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `EMAIL_USER` | Yes | SMTP username, also the default sender |
//! | `EMAIL_PASS` | Yes | SMTP password (for Gmail, an app password) |
//! | `EMAIL_FROM` | No | Sender address (default: `EMAIL_USER`) |
//! | `SMTP_HOST` | No | Relay hostname (default: `smtp.gmail.com`) |
//! | `SMTP_PORT` | No | Port (default: 465 for `tls`, 587 for `starttls`, 25 for `none`) |
//! | `SMTP_TLS` | No | `tls` (default), `starttls`, or `none` |
//!
//! When no credentials are configured, [`LogNotifier`] stands in so invoices
//! can still be created; the payment link is written to the log instead.

mod error;
mod smtp;

pub use error::MailError;
pub use smtp::{LogNotifier, SmtpConfig, SmtpNotifier, SmtpTls};
