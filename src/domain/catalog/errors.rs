use thiserror::Error;
use uuid::Uuid;

use crate::domain::fiscal::value_objects::ValueObjectError;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("Invalid name: {0}")]
  InvalidName(String),

  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Customer not found: {0}")]
  CustomerNotFound(Uuid),

  #[error("Dish not found: {0}")]
  DishNotFound(Uuid),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}
