use thiserror::Error;
use uuid::Uuid;

use super::value_objects::ValueObjectError;
use crate::domain::catalog::errors::CatalogError;

#[derive(Debug, Error)]
pub enum FiscalError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Order has no line items")]
  EmptyOrder,

  #[error("Order {0} was already sealed")]
  AlreadySealed(Uuid),

  /// Counter storage failed. Numbering must never silently restart, so this
  /// aborts the seal instead of falling back to an in-memory count.
  #[error("Sequence allocation failed for series '{series}': {reason}")]
  SequenceUnavailable { series: String, reason: String },

  #[error("Deferred sale requires an existing customer: {0}")]
  CustomerNotFound(Uuid),

  #[error("Catalog error: {0}")]
  Catalog(#[from] CatalogError),

  #[error("Ledger storage error: {0}")]
  Storage(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}
