use serde::Serialize;
use std::sync::Arc;

use crate::domain::fiscal::{FiscalError, InvoiceLedger};

#[derive(Debug, Serialize)]
pub struct VerifyLedgerResponse {
  pub intact: bool,
  /// Index of the first invoice whose hash no longer matches the chain.
  pub broken_at: Option<usize>,
  pub entries: usize,
}

/// Recomputes the persisted hash chain for the audit/diagnostics view.
pub struct VerifyLedgerUseCase {
  ledger: Arc<InvoiceLedger>,
}

impl VerifyLedgerUseCase {
  pub fn new(ledger: Arc<InvoiceLedger>) -> Self {
    Self { ledger }
  }

  pub async fn execute(&self) -> Result<VerifyLedgerResponse, FiscalError> {
    let (verdict, entries) = self.ledger.verify().await?;
    Ok(VerifyLedgerResponse {
      intact: verdict.is_intact(),
      broken_at: verdict.broken_at(),
      entries,
    })
  }
}
