use thiserror::Error;

use crate::domain::catalog::errors::CatalogError;
use crate::domain::fiscal::errors::FiscalError;

#[derive(Debug, Error)]
pub enum ExportError {
  /// No sealed invoices in the requested period. Surfaced explicitly so a
  /// caller can present "no data" instead of shipping a file with an empty
  /// transaction section by accident.
  #[error("No invoices issued in period {month:02}/{year}")]
  EmptyPeriod { year: i32, month: u32 },

  #[error("Invalid period: {0}")]
  InvalidPeriod(String),

  #[error("Fiscal error: {0}")]
  Fiscal(#[from] FiscalError),

  #[error("Catalog error: {0}")]
  Catalog(#[from] CatalogError),
}
