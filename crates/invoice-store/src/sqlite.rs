//! SQLite Invoice Store

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoice_core::{
    Invoice, InvoiceError, InvoiceId, InvoiceStatus, InvoiceStore, MarkPaid, PaymentRef, Result,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SELECT_INVOICE: &str = r#"
SELECT id, customer_email, amount_cents, status, session_ref, created_at, paid_at
FROM invoices
"#;

fn storage(err: impl std::fmt::Display) -> InvoiceError {
    InvoiceError::Storage(err.to_string())
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    customer_email: String,
    amount_cents: i64,
    status: String,
    session_ref: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = InvoiceError;

    fn try_from(row: InvoiceRow) -> Result<Self> {
        Ok(Self {
            id: InvoiceId::from_string(row.id),
            customer_email: row.customer_email,
            amount_cents: row.amount_cents,
            status: InvoiceStatus::parse(&row.status)?,
            session_ref: row.session_ref,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

/// Column and bind value that identify a payment reference
fn key(reference: &PaymentRef) -> (&'static str, &str) {
    match reference {
        PaymentRef::Session(session) => ("session_ref", session.as_str()),
        PaymentRef::Invoice(id) => ("id", id.as_str()),
    }
}

/// Invoice store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteInvoiceStore {
    pool: SqlitePool,
}

impl SqliteInvoiceStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and apply migrations
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!(url = %url, "Invoice database ready");
        Ok(store)
    }

    /// Private in-memory database, for tests and throwaway runs
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage)?;

        // Each connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(storage)
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE {column} = ?1");
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(Invoice::try_from)
            .transpose()
    }
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO invoices ( id, customer_email, amount_cents, status, session_ref, created_at, paid_at )
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7 )
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(&invoice.customer_email)
        .bind(invoice.amount_cents)
        .bind(invoice.status.as_str())
        .bind(invoice.session_ref.as_deref())
        .bind(invoice.created_at)
        .bind(invoice.paid_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn get(&self, id: &InvoiceId) -> Result<Option<Invoice>> {
        self.fetch_one_by("id", id.as_str()).await
    }

    async fn find_by_session(&self, session_ref: &str) -> Result<Option<Invoice>> {
        self.fetch_one_by("session_ref", session_ref).await
    }

    async fn list(&self) -> Result<Vec<Invoice>> {
        let sql = format!("{SELECT_INVOICE} ORDER BY created_at DESC, rowid DESC");
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .into_iter()
            .map(Invoice::try_from)
            .collect()
    }

    async fn mark_paid(&self, reference: &PaymentRef) -> Result<Option<MarkPaid>> {
        let (column, value) = key(reference);

        let sql = format!(
            "UPDATE invoices SET status = 'paid', paid_at = ?1 WHERE {column} = ?2 AND status = 'unpaid'"
        );
        let rows_affected = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();

        if rows_affected > 0 {
            return Ok(Some(MarkPaid::Updated));
        }

        // Nothing flipped: either already paid or no such invoice.
        let exists = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM invoices WHERE {column} = ?1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok((exists > 0).then_some(MarkPaid::AlreadyPaid))
    }

    async fn replace_session(&self, id: &InvoiceId, session_ref: &str) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
UPDATE invoices
SET session_ref = ?1
WHERE id = ?2
            "#,
        )
        .bind(session_ref)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage)?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invoice(email: &str, session: &str) -> Invoice {
        Invoice::new(InvoiceId::generate(), email.into(), 5000).with_session(session)
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip_fields() {
        let store = SqliteInvoiceStore::in_memory().await.unwrap();
        let inv = invoice("a@b.com", "cs_test_1");
        store.insert(&inv).await.unwrap();

        let loaded = store.get(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.customer_email, "a@b.com");
        assert_eq!(loaded.amount_cents, 5000);
        assert_eq!(loaded.status, InvoiceStatus::Unpaid);
        assert_eq!(loaded.session_ref.as_deref(), Some("cs_test_1"));

        let by_session = store.find_by_session("cs_test_1").await.unwrap().unwrap();
        assert_eq!(by_session.id, inv.id);
        assert!(store.get(&InvoiceId::from_string("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_constraints_reject_bad_rows() {
        let store = SqliteInvoiceStore::in_memory().await.unwrap();
        let inv = invoice("a@b.com", "cs_dup");
        store.insert(&inv).await.unwrap();

        assert!(store.insert(&inv).await.is_err());
        assert!(store.insert(&invoice("c@d.com", "cs_dup")).await.is_err());

        let zero = Invoice::new(InvoiceId::generate(), "z@z.com".into(), 0);
        assert!(matches!(store.insert(&zero).await, Err(InvoiceError::Storage(_))));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = SqliteInvoiceStore::in_memory().await.unwrap();
        let mut older = invoice("old@example.com", "cs_old");
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = invoice("new@example.com", "cs_new");

        // Insert out of order; ordering follows created_at.
        store.insert(&newer).await.unwrap();
        store.insert(&older).await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_mark_paid_conditional_update() {
        let store = SqliteInvoiceStore::in_memory().await.unwrap();
        let inv = invoice("a@b.com", "cs_pay");
        store.insert(&inv).await.unwrap();

        let session = PaymentRef::Session("cs_pay".into());
        assert_eq!(store.mark_paid(&session).await.unwrap(), Some(MarkPaid::Updated));
        assert_eq!(store.mark_paid(&session).await.unwrap(), Some(MarkPaid::AlreadyPaid));
        assert_eq!(
            store.mark_paid(&PaymentRef::Invoice(inv.id.clone())).await.unwrap(),
            Some(MarkPaid::AlreadyPaid)
        );
        assert_eq!(
            store.mark_paid(&PaymentRef::Session("cs_none".into())).await.unwrap(),
            None
        );

        let loaded = store.get(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Paid);
        assert!(loaded.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_replace_session() {
        let store = SqliteInvoiceStore::in_memory().await.unwrap();
        let inv = invoice("a@b.com", "cs_first");
        store.insert(&inv).await.unwrap();

        assert!(store.replace_session(&inv.id, "cs_second").await.unwrap());
        assert!(store.find_by_session("cs_first").await.unwrap().is_none());
        assert_eq!(
            store.find_by_session("cs_second").await.unwrap().map(|i| i.id),
            Some(inv.id)
        );
        assert!(!store
            .replace_session(&InvoiceId::from_string("missing"), "cs_x")
            .await
            .unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deliveries_update_once() {
        let path = std::env::temp_dir().join(format!("invoices-{}.db", InvoiceId::generate()));
        let url = format!("sqlite://{}", path.display());
        let store = SqliteInvoiceStore::connect(&url).await.unwrap();

        let inv = invoice("a@b.com", "cs_concurrent");
        store.insert(&inv).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .mark_paid(&PaymentRef::Session("cs_concurrent".into()))
                        .await
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap().unwrap());
        }

        let updated = outcomes.iter().filter(|o| **o == Some(MarkPaid::Updated)).count();
        let already = outcomes.iter().filter(|o| **o == Some(MarkPaid::AlreadyPaid)).count();
        assert_eq!(updated, 1);
        assert_eq!(already, 19);

        let loaded = store.get(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Paid);

        store.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
