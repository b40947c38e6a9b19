use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::catalog::entities::Dish;
use crate::domain::catalog::errors::CatalogError;
use crate::domain::catalog::ports::DishRepository;
use crate::domain::fiscal::value_objects::{Currency, Money};

#[derive(Debug, FromRow)]
struct DishRow {
  id: String,
  name: String,
  price: String,
  cost: String,
  currency: String,
}

impl TryFrom<DishRow> for Dish {
  type Error = CatalogError;

  fn try_from(row: DishRow) -> Result<Self, Self::Error> {
    let id = Uuid::parse_str(&row.id)
      .map_err(|e| CatalogError::Internal(format!("Corrupt dish id: {}", e)))?;
    let currency = Currency::from_str(&row.currency)?;
    let parse_amount = |raw: &str| {
      Decimal::from_str(raw)
        .map_err(|e| CatalogError::Internal(format!("Corrupt amount '{}': {}", raw, e)))
    };
    let price = Money::new(parse_amount(&row.price)?, currency)?;
    let cost = Money::new(parse_amount(&row.cost)?, currency)?;

    Ok(Dish {
      id,
      name: row.name,
      price,
      cost,
    })
  }
}

pub struct SqliteDishRepository {
  pool: SqlitePool,
}

impl SqliteDishRepository {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub async fn insert(&self, dish: &Dish) -> Result<(), CatalogError> {
    sqlx::query(
      r#"
            INSERT INTO dishes (id, name, price, cost, currency)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
    )
    .bind(dish.id.to_string())
    .bind(&dish.name)
    .bind(dish.price.amount.to_string())
    .bind(dish.cost.amount.to_string())
    .bind(dish.price.currency.as_str())
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

#[async_trait]
impl DishRepository for SqliteDishRepository {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Dish>, CatalogError> {
    let row = sqlx::query_as::<_, DishRow>(
      r#"
            SELECT id, name, price, cost, currency
            FROM dishes
            WHERE id = ?1
            "#,
    )
    .bind(id.to_string())
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn list_all(&self) -> Result<Vec<Dish>, CatalogError> {
    let rows = sqlx::query_as::<_, DishRow>(
      r#"
            SELECT id, name, price, cost, currency
            FROM dishes
            ORDER BY name ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infrastructure::persistence::sqlite::{connect, run_migrations};
  use rust_decimal_macros::dec;

  #[tokio::test]
  async fn test_insert_and_list() {
    let pool = connect("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = SqliteDishRepository::new(pool);

    let dish = Dish::new(
      "Moamba de ginguba".to_string(),
      Money::new(dec!(9500), Currency::AOA).unwrap(),
      Money::new(dec!(3200), Currency::AOA).unwrap(),
    )
    .unwrap();
    repo.insert(&dish).await.unwrap();

    let all = repo.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].price.amount, dec!(9500));

    let found = repo.find_by_id(dish.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Moamba de ginguba");
  }
}
