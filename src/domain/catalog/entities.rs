use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::CatalogError;
use crate::domain::fiscal::value_objects::{Currency, Money, ValueObjectError};

// Customer - directory entry with running account balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: Uuid,
  pub name: String,
  /// NIF; exports fall back to the generic consumer id when absent.
  pub tax_id: Option<String>,
  pub outstanding_balance: Money,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Customer {
  pub fn new(name: String, tax_id: Option<String>, currency: Currency) -> Result<Self, CatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
      return Err(CatalogError::InvalidName(
        "Customer name cannot be empty".to_string(),
      ));
    }
    let now = Utc::now();
    Ok(Self {
      id: Uuid::new_v4(),
      name: trimmed.to_string(),
      tax_id,
      outstanding_balance: Money::zero(currency),
      created_at: now,
      updated_at: now,
    })
  }

  /// Books a deferred sale onto the account.
  pub fn credit(&mut self, amount: &Money) -> Result<(), ValueObjectError> {
    self.outstanding_balance = self.outstanding_balance.add(amount)?;
    self.updated_at = Utc::now();
    Ok(())
  }
}

// Dish - menu item with sale price and ingredient cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
  pub id: Uuid,
  pub name: String,
  pub price: Money,
  pub cost: Money,
}

impl Dish {
  pub fn new(name: String, price: Money, cost: Money) -> Result<Self, CatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
      return Err(CatalogError::InvalidName(
        "Dish name cannot be empty".to_string(),
      ));
    }
    Ok(Self {
      id: Uuid::new_v4(),
      name: trimmed.to_string(),
      price,
      cost,
    })
  }
}
