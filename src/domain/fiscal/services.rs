use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::catalog::ports::CustomerRepository;

use super::entities::{ClosedInvoice, Order};
use super::errors::FiscalError;
use super::ports::{BalanceCredit, CHAIN_HEAD_KEY, LedgerStore};
use super::value_objects::{
  ChainHash, Currency, DocumentType, InvoiceNumber, PaymentMethod, SeriesId, ValueObjectError,
};

fn counter_key(series: &SeriesId) -> String {
  format!("series/{}/counter", series)
}

/// Outcome of a chain verification run. Tampering is an expected, handled
/// result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainVerdict {
  Intact,
  /// Index of the first invoice whose stored hash does not match the
  /// recomputed chain.
  BrokenAt(usize),
}

impl ChainVerdict {
  pub fn is_intact(&self) -> bool {
    matches!(self, ChainVerdict::Intact)
  }

  pub fn broken_at(&self) -> Option<usize> {
    match self {
      ChainVerdict::Intact => None,
      ChainVerdict::BrokenAt(position) => Some(*position),
    }
  }
}

/// Recomputes every link from the genesis sentinel and reports the first
/// mismatch. Detects edited fields, removed documents and reordering.
pub fn verify_chain(invoices: &[ClosedInvoice]) -> ChainVerdict {
  let mut previous = ChainHash::genesis();
  for (position, invoice) in invoices.iter().enumerate() {
    let expected = ChainHash::derive(
      &invoice.number,
      invoice.issued_at,
      &invoice.gross_total,
      &previous,
    );
    if invoice.hash != expected {
      return ChainVerdict::BrokenAt(position);
    }
    previous = expected;
  }
  ChainVerdict::Intact
}

struct LedgerState {
  counter: u64,
  chain_head: ChainHash,
  sealed_orders: HashSet<Uuid>,
}

/// Owns the per-series sequence counter and the hash-chain head.
///
/// All allocation and sealing happens inside one mutex so no two callers can
/// observe the same counter value; the counter is persisted before a number
/// is handed out, making a crash-induced gap the worst case instead of a
/// duplicate number.
pub struct InvoiceLedger {
  store: Arc<dyn LedgerStore>,
  customers: Arc<dyn CustomerRepository>,
  series: SeriesId,
  currency: Currency,
  state: Mutex<LedgerState>,
}

impl InvoiceLedger {
  /// Restores counter, chain head and the sealed-order set from the store.
  pub async fn open(
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerRepository>,
    series: SeriesId,
    currency: Currency,
  ) -> Result<Self, FiscalError> {
    let counter = match store.get_state(&counter_key(&series)).await? {
      Some(raw) => raw.parse::<u64>().map_err(|_| {
        FiscalError::Storage(format!("Corrupt counter value for series '{}'", series))
      })?,
      None => 0,
    };

    let chain_head = store
      .get_state(CHAIN_HEAD_KEY)
      .await?
      .map(ChainHash::from_stored)
      .unwrap_or_else(ChainHash::genesis);

    let sealed_orders: HashSet<Uuid> = store
      .list_invoices()
      .await?
      .iter()
      .map(|invoice| invoice.source_order)
      .collect();

    tracing::info!(
      series = %series,
      counter,
      invoices = sealed_orders.len(),
      "Invoice ledger opened"
    );

    Ok(Self {
      store,
      customers,
      series,
      currency,
      state: Mutex::new(LedgerState {
        counter,
        chain_head,
        sealed_orders,
      }),
    })
  }

  pub fn series(&self) -> &SeriesId {
    &self.series
  }

  /// Allocates the next invoice number for the configured series.
  ///
  /// The number is consumed the moment this returns: the incremented counter
  /// is persisted first, so a retry after a failure downstream produces a
  /// documented gap, never a duplicate.
  pub async fn next(&self, document_type: DocumentType) -> Result<InvoiceNumber, FiscalError> {
    let mut state = self.state.lock().await;
    self.allocate(&mut state, document_type).await
  }

  async fn allocate(
    &self,
    state: &mut LedgerState,
    document_type: DocumentType,
  ) -> Result<InvoiceNumber, FiscalError> {
    let sequence = state.counter + 1;

    self
      .store
      .put_state(&counter_key(&self.series), &sequence.to_string())
      .await
      .map_err(|e| FiscalError::SequenceUnavailable {
        series: self.series.value().to_string(),
        reason: e.to_string(),
      })?;

    state.counter = sequence;
    Ok(InvoiceNumber::new(
      document_type,
      self.series.clone(),
      sequence,
    ))
  }

  /// Converts a finalized order into an immutable, chained invoice.
  ///
  /// Invoice, chain head and any customer-account posting go through one
  /// atomic store commit, so a storage fault mid-seal leaves nothing behind
  /// except the already-burnt sequence number.
  pub async fn seal(
    &self,
    order: &Order,
    payment_method: PaymentMethod,
    customer_id: Option<Uuid>,
  ) -> Result<ClosedInvoice, FiscalError> {
    let mut state = self.state.lock().await;

    if order.lines.is_empty() {
      return Err(FiscalError::EmptyOrder);
    }
    if state.sealed_orders.contains(&order.id) {
      return Err(FiscalError::AlreadySealed(order.id));
    }
    if let Some(line) = order.lines.first() {
      if line.unit_price.currency != self.currency {
        return Err(FiscalError::Validation(ValueObjectError::InvalidAmount(
          format!(
            "Order priced in {} but ledger runs in {}",
            line.unit_price.currency.as_str(),
            self.currency.as_str()
          ),
        )));
      }
    }

    // Resolve the account before burning a sequence number on a bad call.
    if payment_method.is_deferred() {
      if let Some(id) = customer_id {
        self
          .customers
          .find_by_id(id)
          .await?
          .ok_or(FiscalError::CustomerNotFound(id))?;
      }
    }

    let document_type = DocumentType::for_payment(payment_method);
    let number = self.allocate(&mut state, document_type).await?;
    let issued_at = Utc::now();

    let invoice = ClosedInvoice::seal(
      order,
      number,
      issued_at,
      payment_method,
      customer_id,
      self.currency,
      &state.chain_head,
    );

    let credit = match (payment_method.is_deferred(), customer_id) {
      (true, Some(id)) => Some(BalanceCredit {
        customer_id: id,
        amount: invoice.gross_total.clone(),
      }),
      _ => None,
    };

    // Single atomic commit; in-memory state advances only on success
    self.store.commit_seal(&invoice, credit.as_ref()).await?;

    state.chain_head = invoice.hash.clone();
    state.sealed_orders.insert(order.id);

    tracing::info!(
      invoice = %invoice.number,
      document_type = invoice.number.document_type().code(),
      gross = %invoice.gross_total,
      "Invoice sealed"
    );

    Ok(invoice)
  }

  /// Verifies the persisted chain against a single snapshot read.
  pub async fn verify(&self) -> Result<(ChainVerdict, usize), FiscalError> {
    let invoices = self.store.list_invoices().await?;
    let verdict = verify_chain(&invoices);
    if let ChainVerdict::BrokenAt(position) = verdict {
      tracing::warn!(position, "Invoice chain verification failed");
    }
    Ok((verdict, invoices.len()))
  }

  pub async fn chain_head(&self) -> ChainHash {
    self.state.lock().await.chain_head.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::catalog::entities::Customer;
  use crate::domain::fiscal::entities::OrderLine;
  use crate::domain::fiscal::value_objects::{Money, Quantity, TaxRate};
  use crate::infrastructure::persistence::memory::{
    InMemoryCustomerRepository, InMemoryLedgerStore,
  };
  use async_trait::async_trait;
  use rust_decimal::Decimal;
  use rust_decimal_macros::dec;
  use std::sync::atomic::{AtomicBool, Ordering};

  fn order_line(price: Decimal) -> OrderLine {
    OrderLine::new(
      Uuid::new_v4(),
      "Calulu de peixe".to_string(),
      Quantity::new(dec!(1)).unwrap(),
      Money::new(price, Currency::AOA).unwrap(),
      Money::new(price / dec!(3), Currency::AOA).unwrap(),
      TaxRate::new(dec!(14)).unwrap(),
    )
    .unwrap()
  }

  async fn ledger_with(
    store: Arc<dyn LedgerStore>,
    customers: Arc<InMemoryCustomerRepository>,
  ) -> InvoiceLedger {
    InvoiceLedger::open(
      store,
      customers,
      SeriesId::new("VER2025".to_string()).unwrap(),
      Currency::AOA,
    )
    .await
    .unwrap()
  }

  #[tokio::test]
  async fn test_sequence_is_gapless_and_monotonic() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = ledger_with(store, Arc::new(InMemoryCustomerRepository::new())).await;

    for expected in 1..=5u64 {
      let number = ledger.next(DocumentType::FacturaRecibo).await.unwrap();
      assert_eq!(number.sequence(), expected);
    }
  }

  #[tokio::test]
  async fn test_counter_survives_reopen() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let customers = Arc::new(InMemoryCustomerRepository::new());

    let ledger = ledger_with(store.clone(), customers.clone()).await;
    ledger.next(DocumentType::FacturaRecibo).await.unwrap();
    ledger.next(DocumentType::FacturaRecibo).await.unwrap();

    let reopened = ledger_with(store, customers).await;
    let number = reopened.next(DocumentType::FacturaRecibo).await.unwrap();
    assert_eq!(number.sequence(), 3);
  }

  #[tokio::test]
  async fn test_seal_example_scenario() {
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let store = Arc::new(InMemoryLedgerStore::with_customers(customers.clone()));
    let customer = Customer::new("Sr. Domingos".to_string(), None, Currency::AOA).unwrap();
    let customer_id = customer.id;
    customers.insert(customer).await;

    let ledger = ledger_with(store.clone(), customers.clone()).await;

    // First order: two dishes, immediate payment
    let first = Order::new(
      Some("Mesa 1".to_string()),
      vec![order_line(dec!(9500)), order_line(dec!(8200))],
    )
    .unwrap();
    let inv1 = ledger.seal(&first, PaymentMethod::Cash, None).await.unwrap();
    assert_eq!(inv1.number.to_string(), "FR VER2025/1");
    assert_eq!(inv1.gross_total.amount, dec!(17700));
    assert_eq!(
      inv1.hash,
      ChainHash::derive(
        &inv1.number,
        inv1.issued_at,
        &inv1.gross_total,
        &ChainHash::genesis()
      )
    );

    // Second order: deferred sale on the customer account
    let second = Order::new(None, vec![order_line(dec!(2000))]).unwrap();
    let inv2 = ledger
      .seal(&second, PaymentMethod::CustomerAccount, Some(customer_id))
      .await
      .unwrap();
    assert_eq!(inv2.number.to_string(), "FT VER2025/2");
    assert_eq!(
      inv2.hash,
      ChainHash::derive(&inv2.number, inv2.issued_at, &inv2.gross_total, &inv1.hash)
    );

    // Balance side effect
    let booked = customers.find_by_id(customer_id).await.unwrap().unwrap();
    assert_eq!(booked.outstanding_balance.amount, dec!(2000));

    // Persisted chain verifies
    let (verdict, entries) = ledger.verify().await.unwrap();
    assert!(verdict.is_intact());
    assert_eq!(entries, 2);
  }

  #[tokio::test]
  async fn test_immediate_payment_leaves_balance_untouched() {
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let customer = Customer::new("Sra. Beatriz".to_string(), None, Currency::AOA).unwrap();
    let customer_id = customer.id;
    customers.insert(customer).await;

    let ledger = ledger_with(Arc::new(InMemoryLedgerStore::new()), customers.clone()).await;
    let order = Order::new(None, vec![order_line(dec!(4500))]).unwrap();
    ledger
      .seal(&order, PaymentMethod::Multicaixa, Some(customer_id))
      .await
      .unwrap();

    let unchanged = customers.find_by_id(customer_id).await.unwrap().unwrap();
    assert_eq!(unchanged.outstanding_balance.amount, dec!(0));
  }

  #[tokio::test]
  async fn test_empty_order_rejected() {
    let ledger = ledger_with(
      Arc::new(InMemoryLedgerStore::new()),
      Arc::new(InMemoryCustomerRepository::new()),
    )
    .await;

    let empty = Order::new(None, vec![]).unwrap();
    let result = ledger.seal(&empty, PaymentMethod::Cash, None).await;
    assert!(matches!(result, Err(FiscalError::EmptyOrder)));
  }

  #[tokio::test]
  async fn test_seal_is_guarded_against_double_sealing() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = ledger_with(store.clone(), Arc::new(InMemoryCustomerRepository::new())).await;

    let order = Order::new(None, vec![order_line(dec!(3000))]).unwrap();
    let invoice = ledger.seal(&order, PaymentMethod::Cash, None).await.unwrap();

    let second = ledger.seal(&order, PaymentMethod::Cash, None).await;
    assert!(matches!(second, Err(FiscalError::AlreadySealed(id)) if id == order.id));

    // The rejected call neither allocated a number nor moved the chain head
    assert_eq!(ledger.chain_head().await, invoice.hash);
    let next_order = Order::new(None, vec![order_line(dec!(1000))]).unwrap();
    let next = ledger
      .seal(&next_order, PaymentMethod::Cash, None)
      .await
      .unwrap();
    assert_eq!(next.number.sequence(), 2);
  }

  #[tokio::test]
  async fn test_sealed_orders_restored_on_reopen() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let customers = Arc::new(InMemoryCustomerRepository::new());

    let ledger = ledger_with(store.clone(), customers.clone()).await;
    let order = Order::new(None, vec![order_line(dec!(3000))]).unwrap();
    ledger.seal(&order, PaymentMethod::Cash, None).await.unwrap();

    let reopened = ledger_with(store, customers).await;
    let result = reopened.seal(&order, PaymentMethod::Cash, None).await;
    assert!(matches!(result, Err(FiscalError::AlreadySealed(_))));
  }

  #[tokio::test]
  async fn test_deferred_sale_requires_known_customer() {
    let ledger = ledger_with(
      Arc::new(InMemoryLedgerStore::new()),
      Arc::new(InMemoryCustomerRepository::new()),
    )
    .await;

    let order = Order::new(None, vec![order_line(dec!(3000))]).unwrap();
    let ghost = Uuid::new_v4();
    let result = ledger
      .seal(&order, PaymentMethod::CustomerAccount, Some(ghost))
      .await;
    assert!(matches!(result, Err(FiscalError::CustomerNotFound(id)) if id == ghost));

    // The failed precondition consumed nothing
    let retry = ledger.seal(&order, PaymentMethod::Cash, None).await.unwrap();
    assert_eq!(retry.number.sequence(), 1);
  }

  #[tokio::test]
  async fn test_tampering_detected_at_mutation_point() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = ledger_with(store.clone(), Arc::new(InMemoryCustomerRepository::new())).await;

    for _ in 0..4 {
      let order = Order::new(None, vec![order_line(dec!(1500))]).unwrap();
      ledger.seal(&order, PaymentMethod::Cash, None).await.unwrap();
    }

    let mut invoices = store.list_invoices().await.unwrap();
    assert!(verify_chain(&invoices).is_intact());

    // Edited total
    invoices[2].gross_total = Money::new(dec!(1), Currency::AOA).unwrap();
    assert_eq!(verify_chain(&invoices), ChainVerdict::BrokenAt(2));

    // Deleted document shifts every later link
    let mut truncated = store.list_invoices().await.unwrap();
    truncated.remove(1);
    assert_eq!(verify_chain(&truncated), ChainVerdict::BrokenAt(1));

    // Reordered documents
    let mut reordered = store.list_invoices().await.unwrap();
    reordered.swap(0, 1);
    assert_eq!(verify_chain(&reordered), ChainVerdict::BrokenAt(0));
  }

  #[test]
  fn test_empty_chain_is_intact() {
    assert!(verify_chain(&[]).is_intact());
  }

  #[tokio::test]
  async fn test_seal_rejects_foreign_currency_order() {
    let ledger = ledger_with(
      Arc::new(InMemoryLedgerStore::new()),
      Arc::new(InMemoryCustomerRepository::new()),
    )
    .await;

    let line = OrderLine::new(
      Uuid::new_v4(),
      "Imported wine".to_string(),
      Quantity::new(dec!(1)).unwrap(),
      Money::new(dec!(20), Currency::USD).unwrap(),
      Money::new(dec!(8), Currency::USD).unwrap(),
      TaxRate::new(dec!(14)).unwrap(),
    )
    .unwrap();
    let order = Order::new(None, vec![line]).unwrap();

    let result = ledger.seal(&order, PaymentMethod::Cash, None).await;
    assert!(matches!(result, Err(FiscalError::Validation(_))));
  }

  /// Store whose next commit fails, standing in for a transient storage
  /// fault between number allocation and the durable write.
  struct FailingStore {
    inner: InMemoryLedgerStore,
    fail_next: AtomicBool,
  }

  impl FailingStore {
    fn new(customers: Arc<InMemoryCustomerRepository>) -> Self {
      Self {
        inner: InMemoryLedgerStore::with_customers(customers),
        fail_next: AtomicBool::new(false),
      }
    }

    fn fail_next_commit(&self) {
      self.fail_next.store(true, Ordering::SeqCst);
    }
  }

  #[async_trait]
  impl LedgerStore for FailingStore {
    async fn get_state(&self, key: &str) -> Result<Option<String>, FiscalError> {
      self.inner.get_state(key).await
    }

    async fn put_state(&self, key: &str, value: &str) -> Result<(), FiscalError> {
      self.inner.put_state(key, value).await
    }

    async fn commit_seal(
      &self,
      invoice: &ClosedInvoice,
      credit: Option<&BalanceCredit>,
    ) -> Result<(), FiscalError> {
      if self.fail_next.swap(false, Ordering::SeqCst) {
        return Err(FiscalError::Storage("Disk full".to_string()));
      }
      self.inner.commit_seal(invoice, credit).await
    }

    async fn list_invoices(&self) -> Result<Vec<ClosedInvoice>, FiscalError> {
      self.inner.list_invoices().await
    }
  }

  #[tokio::test]
  async fn test_failed_commit_leaves_no_partial_state() {
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let customer = Customer::new("Sr. Domingos".to_string(), None, Currency::AOA).unwrap();
    let customer_id = customer.id;
    customers.insert(customer).await;

    let store = Arc::new(FailingStore::new(customers.clone()));
    let ledger = ledger_with(store.clone(), customers.clone()).await;

    let first = Order::new(None, vec![order_line(dec!(2000))]).unwrap();
    let inv1 = ledger.seal(&first, PaymentMethod::Cash, None).await.unwrap();

    // Deferred seal against a failing store
    store.fail_next_commit();
    let doomed = Order::new(None, vec![order_line(dec!(5000))]).unwrap();
    let result = ledger
      .seal(&doomed, PaymentMethod::CustomerAccount, Some(customer_id))
      .await;
    assert!(matches!(result, Err(FiscalError::Storage(_))));

    // Nothing from the failed seal is observable: no invoice, no chain head
    // movement, no balance posting, order not marked sealed
    assert_eq!(store.list_invoices().await.unwrap().len(), 1);
    assert_eq!(ledger.chain_head().await, inv1.hash);
    let untouched = customers.find_by_id(customer_id).await.unwrap().unwrap();
    assert_eq!(untouched.outstanding_balance.amount, dec!(0));

    // The retry succeeds; the burnt number shows up as a gap, the chain
    // stays intact
    let inv2 = ledger
      .seal(&doomed, PaymentMethod::CustomerAccount, Some(customer_id))
      .await
      .unwrap();
    assert_eq!(inv2.number.sequence(), 3);
    let booked = customers.find_by_id(customer_id).await.unwrap().unwrap();
    assert_eq!(booked.outstanding_balance.amount, dec!(5000));

    let (verdict, entries) = ledger.verify().await.unwrap();
    assert!(verdict.is_intact());
    assert_eq!(entries, 2);
  }
}
