use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::fiscal::entities::ClosedInvoice;
use crate::domain::fiscal::errors::FiscalError;
use crate::domain::fiscal::ports::{BalanceCredit, CHAIN_HEAD_KEY, LedgerStore};

/// SQLite-backed ledger store. Counter and chain-head state go through the
/// key/value `ledger_state` table; invoices are appended as JSON documents
/// with indexed metadata and listed back in insertion (chain) order.
pub struct SqliteLedgerStore {
  pool: SqlitePool,
}

impl SqliteLedgerStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
  async fn get_state(&self, key: &str) -> Result<Option<String>, FiscalError> {
    let value = sqlx::query_scalar::<_, String>(
      r#"
            SELECT value FROM ledger_state WHERE key = ?1
            "#,
    )
    .bind(key)
    .fetch_optional(&self.pool)
    .await?;

    Ok(value)
  }

  async fn put_state(&self, key: &str, value: &str) -> Result<(), FiscalError> {
    sqlx::query(
      r#"
            INSERT INTO ledger_state (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
    )
    .bind(key)
    .bind(value)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn commit_seal(
    &self,
    invoice: &ClosedInvoice,
    credit: Option<&BalanceCredit>,
  ) -> Result<(), FiscalError> {
    let document = serde_json::to_string(invoice)
      .map_err(|e| FiscalError::Storage(format!("Failed to serialize invoice: {}", e)))?;

    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
            INSERT INTO invoices (invoice_no, series, sequence, issued_at, source_order, document)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
    )
    .bind(invoice.number.to_string())
    .bind(invoice.number.series().value())
    .bind(invoice.number.sequence() as i64)
    .bind(invoice.issued_at.to_rfc3339())
    .bind(invoice.source_order.to_string())
    .bind(document)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
      r#"
            INSERT INTO ledger_state (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
    )
    .bind(CHAIN_HEAD_KEY)
    .bind(invoice.hash.value())
    .execute(&mut *tx)
    .await?;

    if let Some(credit) = credit {
      let raw = sqlx::query_scalar::<_, String>(
        r#"
            SELECT outstanding_balance FROM customers WHERE id = ?1
            "#,
      )
      .bind(credit.customer_id.to_string())
      .fetch_optional(&mut *tx)
      .await?
      .ok_or(FiscalError::CustomerNotFound(credit.customer_id))?;

      let balance = Decimal::from_str(&raw)
        .map_err(|e| FiscalError::Storage(format!("Corrupt balance: {}", e)))?;

      sqlx::query(
        r#"
            UPDATE customers
            SET outstanding_balance = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
      )
      .bind(credit.customer_id.to_string())
      .bind((balance + credit.amount.amount).to_string())
      .bind(Utc::now().to_rfc3339())
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn list_invoices(&self) -> Result<Vec<ClosedInvoice>, FiscalError> {
    let documents = sqlx::query_scalar::<_, String>(
      r#"
            SELECT document FROM invoices ORDER BY rowid ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    documents
      .into_iter()
      .map(|document| {
        serde_json::from_str(&document)
          .map_err(|e| FiscalError::Storage(format!("Corrupt invoice document: {}", e)))
      })
      .collect()
  }
}
