use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::catalog::entities::{Customer, Dish};
use crate::domain::catalog::errors::CatalogError;
use crate::domain::catalog::ports::{CustomerRepository, DishRepository};
use crate::domain::fiscal::entities::ClosedInvoice;
use crate::domain::fiscal::errors::FiscalError;
use crate::domain::fiscal::ports::{BalanceCredit, CHAIN_HEAD_KEY, LedgerStore};
use crate::domain::fiscal::value_objects::Money;

/// Ledger store backed by process memory. Used in tests and demos; real
/// deployments use the SQLite adapter so state survives restarts.
///
/// Deferred sales post against a customer directory shared with the rest of
/// the test fixture; construct via [`InMemoryLedgerStore::with_customers`]
/// when commits carry a balance credit.
#[derive(Default)]
pub struct InMemoryLedgerStore {
  state: Mutex<HashMap<String, String>>,
  invoices: Mutex<Vec<ClosedInvoice>>,
  customers: Option<Arc<InMemoryCustomerRepository>>,
}

impl InMemoryLedgerStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_customers(customers: Arc<InMemoryCustomerRepository>) -> Self {
    Self {
      customers: Some(customers),
      ..Self::default()
    }
  }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
  async fn get_state(&self, key: &str) -> Result<Option<String>, FiscalError> {
    Ok(self.state.lock().await.get(key).cloned())
  }

  async fn put_state(&self, key: &str, value: &str) -> Result<(), FiscalError> {
    self
      .state
      .lock()
      .await
      .insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn commit_seal(
    &self,
    invoice: &ClosedInvoice,
    credit: Option<&BalanceCredit>,
  ) -> Result<(), FiscalError> {
    // The balance posting is the only fallible step; it runs first so a
    // rejected credit leaves invoices and chain head untouched.
    if let Some(credit) = credit {
      let customers = self.customers.as_ref().ok_or_else(|| {
        FiscalError::Storage("No customer directory attached to this store".to_string())
      })?;
      customers
        .add_outstanding(credit.customer_id, &credit.amount)
        .await?;
    }

    self.invoices.lock().await.push(invoice.clone());
    self
      .state
      .lock()
      .await
      .insert(CHAIN_HEAD_KEY.to_string(), invoice.hash.value().to_string());
    Ok(())
  }

  async fn list_invoices(&self) -> Result<Vec<ClosedInvoice>, FiscalError> {
    Ok(self.invoices.lock().await.clone())
  }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
  customers: Mutex<HashMap<Uuid, Customer>>,
}

impl InMemoryCustomerRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn insert(&self, customer: Customer) {
    self.customers.lock().await.insert(customer.id, customer);
  }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, CatalogError> {
    Ok(self.customers.lock().await.get(&id).cloned())
  }

  async fn list_all(&self) -> Result<Vec<Customer>, CatalogError> {
    let mut all: Vec<Customer> = self.customers.lock().await.values().cloned().collect();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(all)
  }

  async fn add_outstanding(&self, id: Uuid, amount: &Money) -> Result<(), CatalogError> {
    let mut customers = self.customers.lock().await;
    let customer = customers
      .get_mut(&id)
      .ok_or(CatalogError::CustomerNotFound(id))?;
    customer.credit(amount)?;
    Ok(())
  }
}

#[derive(Default)]
pub struct InMemoryDishRepository {
  dishes: Mutex<HashMap<Uuid, Dish>>,
}

impl InMemoryDishRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn insert(&self, dish: Dish) {
    self.dishes.lock().await.insert(dish.id, dish);
  }
}

#[async_trait]
impl DishRepository for InMemoryDishRepository {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Dish>, CatalogError> {
    Ok(self.dishes.lock().await.get(&id).cloned())
  }

  async fn list_all(&self) -> Result<Vec<Dish>, CatalogError> {
    let mut all: Vec<Dish> = self.dishes.lock().await.values().cloned().collect();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(all)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::fiscal::entities::{Order, OrderLine};
  use crate::domain::fiscal::value_objects::{
    ChainHash, Currency, DocumentType, InvoiceNumber, PaymentMethod, Quantity, SeriesId, TaxRate,
  };
  use chrono::Utc;
  use rust_decimal_macros::dec;

  fn sealed(customer_id: Option<Uuid>) -> ClosedInvoice {
    let line = OrderLine::new(
      Uuid::new_v4(),
      "Calulu de peixe".to_string(),
      Quantity::new(dec!(1)).unwrap(),
      Money::new(dec!(4000), Currency::AOA).unwrap(),
      Money::new(dec!(1500), Currency::AOA).unwrap(),
      TaxRate::new(dec!(14)).unwrap(),
    )
    .unwrap();
    let order = Order::new(None, vec![line]).unwrap();
    ClosedInvoice::seal(
      &order,
      InvoiceNumber::new(
        DocumentType::Factura,
        SeriesId::new("VER2025".to_string()).unwrap(),
        1,
      ),
      Utc::now(),
      PaymentMethod::CustomerAccount,
      customer_id,
      Currency::AOA,
      &ChainHash::genesis(),
    )
  }

  #[tokio::test]
  async fn test_commit_seal_advances_chain_head_and_balance() {
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let customer = Customer::new("Dona Yolanda".to_string(), None, Currency::AOA).unwrap();
    let customer_id = customer.id;
    customers.insert(customer).await;

    let store = InMemoryLedgerStore::with_customers(customers.clone());
    let invoice = sealed(Some(customer_id));
    let credit = BalanceCredit {
      customer_id,
      amount: invoice.gross_total.clone(),
    };
    store.commit_seal(&invoice, Some(&credit)).await.unwrap();

    assert_eq!(store.list_invoices().await.unwrap().len(), 1);
    assert_eq!(
      store.get_state(CHAIN_HEAD_KEY).await.unwrap(),
      Some(invoice.hash.value().to_string())
    );
    let booked = customers.find_by_id(customer_id).await.unwrap().unwrap();
    assert_eq!(booked.outstanding_balance.amount, dec!(4000));
  }

  #[tokio::test]
  async fn test_rejected_credit_commits_nothing() {
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let store = InMemoryLedgerStore::with_customers(customers);

    let ghost = Uuid::new_v4();
    let invoice = sealed(Some(ghost));
    let credit = BalanceCredit {
      customer_id: ghost,
      amount: invoice.gross_total.clone(),
    };
    let result = store.commit_seal(&invoice, Some(&credit)).await;
    assert!(result.is_err());

    assert!(store.list_invoices().await.unwrap().is_empty());
    assert_eq!(store.get_state(CHAIN_HEAD_KEY).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_state_roundtrip() {
    let store = InMemoryLedgerStore::new();
    assert_eq!(store.get_state("series/VER2025/counter").await.unwrap(), None);

    store.put_state("series/VER2025/counter", "7").await.unwrap();
    assert_eq!(
      store.get_state("series/VER2025/counter").await.unwrap(),
      Some("7".to_string())
    );
  }

  #[tokio::test]
  async fn test_add_outstanding_unknown_customer() {
    let repo = InMemoryCustomerRepository::new();
    let amount = Money::new(dec!(100), Currency::AOA).unwrap();
    let result = repo.add_outstanding(Uuid::new_v4(), &amount).await;
    assert!(matches!(result, Err(CatalogError::CustomerNotFound(_))));
  }
}
