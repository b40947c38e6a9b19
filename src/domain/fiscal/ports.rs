use async_trait::async_trait;
use uuid::Uuid;

use super::entities::ClosedInvoice;
use super::errors::FiscalError;
use super::value_objects::Money;

/// State key holding the current chain head hash.
pub const CHAIN_HEAD_KEY: &str = "chain/head";

/// Customer-account posting applied together with a sealed invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceCredit {
  pub customer_id: Uuid,
  pub amount: Money,
}

/// Persistence contract for the invoice ledger.
///
/// Counter and chain-head state go through a plain get/set-by-key surface so
/// the storage engine stays swappable; sealed invoices are append-only.
#[async_trait]
pub trait LedgerStore: Send + Sync {
  async fn get_state(&self, key: &str) -> Result<Option<String>, FiscalError>;
  async fn put_state(&self, key: &str, value: &str) -> Result<(), FiscalError>;

  /// Persists one sealed invoice, advances the chain head under
  /// [`CHAIN_HEAD_KEY`] to the invoice's own hash and, for deferred sales,
  /// posts the credit onto the customer account.
  ///
  /// The three writes commit as a unit: on any error nothing is persisted.
  /// A partially applied seal would leave the stored chain pointing at a
  /// stale head and corrupt every later link.
  async fn commit_seal(
    &self,
    invoice: &ClosedInvoice,
    credit: Option<&BalanceCredit>,
  ) -> Result<(), FiscalError>;

  /// Returns sealed invoices in insertion (chain) order.
  async fn list_invoices(&self) -> Result<Vec<ClosedInvoice>, FiscalError>;
}
