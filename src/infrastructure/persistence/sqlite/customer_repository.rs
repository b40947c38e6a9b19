use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::catalog::entities::Customer;
use crate::domain::catalog::errors::CatalogError;
use crate::domain::catalog::ports::CustomerRepository;
use crate::domain::fiscal::value_objects::{Currency, Money};

#[derive(Debug, FromRow)]
struct CustomerRow {
  id: String,
  name: String,
  tax_id: Option<String>,
  outstanding_balance: String,
  currency: String,
  created_at: String,
  updated_at: String,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CatalogError> {
  DateTime::parse_from_rfc3339(raw)
    .map(|t| t.with_timezone(&Utc))
    .map_err(|e| CatalogError::Internal(format!("Corrupt timestamp '{}': {}", raw, e)))
}

impl TryFrom<CustomerRow> for Customer {
  type Error = CatalogError;

  fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
    let id = Uuid::parse_str(&row.id)
      .map_err(|e| CatalogError::Internal(format!("Corrupt customer id: {}", e)))?;
    let currency = Currency::from_str(&row.currency)?;
    let amount = Decimal::from_str(&row.outstanding_balance)
      .map_err(|e| CatalogError::Internal(format!("Corrupt balance: {}", e)))?;
    let outstanding_balance = Money::new(amount, currency)?;

    Ok(Customer {
      id,
      name: row.name,
      tax_id: row.tax_id,
      outstanding_balance,
      created_at: parse_timestamp(&row.created_at)?,
      updated_at: parse_timestamp(&row.updated_at)?,
    })
  }
}

pub struct SqliteCustomerRepository {
  pool: SqlitePool,
}

impl SqliteCustomerRepository {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Directory maintenance entry point; the ledger itself never creates
  /// customers.
  pub async fn insert(&self, customer: &Customer) -> Result<(), CatalogError> {
    sqlx::query(
      r#"
            INSERT INTO customers (id, name, tax_id, outstanding_balance, currency, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
    )
    .bind(customer.id.to_string())
    .bind(&customer.name)
    .bind(&customer.tax_id)
    .bind(customer.outstanding_balance.amount.to_string())
    .bind(customer.outstanding_balance.currency.as_str())
    .bind(customer.created_at.to_rfc3339())
    .bind(customer.updated_at.to_rfc3339())
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

#[async_trait]
impl CustomerRepository for SqliteCustomerRepository {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, CatalogError> {
    let row = sqlx::query_as::<_, CustomerRow>(
      r#"
            SELECT id, name, tax_id, outstanding_balance, currency, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
    )
    .bind(id.to_string())
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn list_all(&self) -> Result<Vec<Customer>, CatalogError> {
    let rows = sqlx::query_as::<_, CustomerRow>(
      r#"
            SELECT id, name, tax_id, outstanding_balance, currency, created_at, updated_at
            FROM customers
            ORDER BY name ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn add_outstanding(&self, id: Uuid, amount: &Money) -> Result<(), CatalogError> {
    let mut tx = self.pool.begin().await?;

    let row = sqlx::query_as::<_, CustomerRow>(
      r#"
            SELECT id, name, tax_id, outstanding_balance, currency, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    let mut customer: Customer = row
      .ok_or(CatalogError::CustomerNotFound(id))?
      .try_into()?;
    customer.credit(amount)?;

    sqlx::query(
      r#"
            UPDATE customers
            SET outstanding_balance = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
    )
    .bind(id.to_string())
    .bind(customer.outstanding_balance.amount.to_string())
    .bind(customer.updated_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
  }
}
