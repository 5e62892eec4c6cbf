//! Server-rendered pages
//!
//! Plain HTML strings; every interpolated value goes through [`escape`].

use std::fmt::Write;

use axum::http::StatusCode;
use invoice_core::{CreatedInvoice, Invoice, InvoiceStatus, ReminderSent};

const STYLE: &str = "font-family: Arial; max-width: 640px; margin:auto; padding:20px;";
const INPUT_STYLE: &str = "width:100%; padding:8px; margin-bottom:10px;";
const BUTTON_STYLE: &str =
    "padding:10px 20px; background:#4CAF50; color:white; border:none; border-radius:5px;";

/// Escape text for use in HTML bodies and quoted attributes
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>{title}</title></head>
  <body style="{STYLE}">
    <nav><a href="/">New invoice</a> | <a href="/invoices">All invoices</a></nav>
{body}
  </body>
</html>
"#,
        title = escape(title),
    )
}

pub fn create_form() -> String {
    layout(
        "Create Invoice",
        &format!(
            r#"    <h2>Create Invoice</h2>
    <form action="/create_invoice" method="POST">
      <label>Email:</label><br>
      <input type="email" name="email" placeholder="Customer Email" required style="{INPUT_STYLE}"><br>
      <label>Amount (in cents):</label><br>
      <input type="number" name="amount" min="1" placeholder="5000 = $50.00" required style="{INPUT_STYLE}"><br>
      <button type="submit" style="{BUTTON_STYLE}">Send Invoice</button>
    </form>"#
        ),
    )
}

pub fn invoice_created(created: &CreatedInvoice) -> String {
    let invoice = &created.invoice;
    let url = escape(&created.payment_url);

    layout(
        "Invoice Created",
        &format!(
            r#"    <h2>Invoice {id}</h2>
    <p>Invoice created. The payment link is on its way to {email}.</p>
    <p>Amount: {amount}</p>
    <p>Payment link: <a href="{url}">{url}</a></p>"#,
            id = escape(invoice.id.as_str()),
            email = escape(&invoice.customer_email),
            amount = invoice.display_amount(),
        ),
    )
}

pub fn invoice_list(invoices: &[Invoice]) -> String {
    let mut rows = String::new();

    for invoice in invoices {
        let action = match invoice.status {
            InvoiceStatus::Unpaid => format!(
                r#"<form action="/send_reminder" method="POST" style="margin:0">
            <input type="hidden" name="invoice_id" value="{}">
            <button type="submit">Send reminder</button>
          </form>"#,
                escape(invoice.id.as_str())
            ),
            InvoiceStatus::Paid => String::new(),
        };

        // Writing to a String cannot fail.
        let _ = write!(
            rows,
            r#"
      <tr>
        <td>{id}</td>
        <td>{email}</td>
        <td>{amount}</td>
        <td>{status}</td>
        <td>{created}</td>
        <td>{action}</td>
      </tr>"#,
            id = escape(invoice.id.as_str()),
            email = escape(&invoice.customer_email),
            amount = invoice.display_amount(),
            status = invoice.status,
            created = invoice.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }

    if invoices.is_empty() {
        rows.push_str(r#"<tr><td colspan="6">No invoices yet.</td></tr>"#);
    }

    layout(
        "Invoices",
        &format!(
            r#"    <h2>Invoices</h2>
    <table border="1" cellpadding="6" style="border-collapse:collapse; width:100%">
      <tr><th>ID</th><th>Email</th><th>Amount</th><th>Status</th><th>Created</th><th></th></tr>{rows}
    </table>"#
        ),
    )
}

pub fn reminder_sent(reminder: &ReminderSent) -> String {
    layout(
        "Reminder Sent",
        &format!(
            r#"    <h2>Reminder sent</h2>
    <p>A reminder for invoice {id} ({amount}) was sent to {email}.</p>
    <p><a href="/invoices">Back to invoices</a></p>"#,
            id = escape(reminder.invoice.id.as_str()),
            amount = reminder.invoice.display_amount(),
            email = escape(&reminder.invoice.customer_email),
        ),
    )
}

/// Shown after the Stripe redirect. Reports state, never changes it.
pub fn success(invoice: Option<&Invoice>) -> String {
    let detail = match invoice {
        Some(invoice) if invoice.is_paid() => {
            format!("<p>Invoice {} has been paid.</p>", escape(invoice.id.as_str()))
        }
        Some(invoice) => format!(
            "<p>We are confirming the payment for invoice {}. This page will not change \
             the invoice; the confirmation arrives from the payment provider shortly.</p>",
            escape(invoice.id.as_str())
        ),
        None => String::new(),
    };

    layout(
        "Thank You",
        &format!("    <h2>Thank you!</h2>\n    <p>Your payment was submitted.</p>\n    {detail}"),
    )
}

pub fn cancel() -> String {
    layout(
        "Payment Cancelled",
        "    <h2>Payment cancelled</h2>\n    <p>No charge was made. You can use the link in your email to try again.</p>",
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    layout(
        "Error",
        &format!(
            "    <h2>{}</h2>\n    <p>{}</p>",
            status.canonical_reason().unwrap_or("Error"),
            escape(message)
        ),
    )
}
