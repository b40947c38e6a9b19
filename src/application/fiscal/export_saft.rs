use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::catalog::ports::{CustomerRepository, DishRepository};
use crate::domain::fiscal::LedgerStore;
use crate::domain::saft::{self, AuditPeriod, CompanyProfile, ExportError};

#[derive(Debug, Deserialize)]
pub struct ExportSaftCommand {
  pub year: i32,
  pub month: u32,
}

#[derive(Debug, Serialize)]
pub struct ExportSaftResponse {
  pub xml: String,
  pub entries: usize,
  pub gross_total: Decimal,
}

/// Assembles the SAF-T file for one period from a single snapshot read of
/// the ledger. Writing the file to disk is the caller's concern.
pub struct ExportSaftUseCase {
  store: Arc<dyn LedgerStore>,
  customers: Arc<dyn CustomerRepository>,
  dishes: Arc<dyn DishRepository>,
  company: CompanyProfile,
}

impl ExportSaftUseCase {
  pub fn new(
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerRepository>,
    dishes: Arc<dyn DishRepository>,
    company: CompanyProfile,
  ) -> Self {
    Self {
      store,
      customers,
      dishes,
      company,
    }
  }

  pub async fn execute(&self, command: ExportSaftCommand) -> Result<ExportSaftResponse, ExportError> {
    let period = AuditPeriod::new(command.year, command.month)?;

    let invoices = self.store.list_invoices().await?;
    let customers = self.customers.list_all().await?;
    let dishes = self.dishes.list_all().await?;

    let document = saft::build(&invoices, &customers, &dishes, &self.company, period)?;
    let entries = document.source_documents.number_of_entries;
    let gross_total = document.source_documents.total_credit;

    tracing::info!(
      year = command.year,
      month = command.month,
      entries,
      "SAF-T export built"
    );

    Ok(ExportSaftResponse {
      xml: document.to_xml(),
      entries,
      gross_total,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::fiscal::{
    Currency, InvoiceLedger, Money, Order, OrderLine, PaymentMethod, Quantity, SeriesId, TaxRate,
  };
  use crate::infrastructure::persistence::memory::{
    InMemoryCustomerRepository, InMemoryDishRepository, InMemoryLedgerStore,
  };
  use chrono::{Datelike, Utc};
  use rust_decimal_macros::dec;
  use uuid::Uuid;

  fn company() -> CompanyProfile {
    CompanyProfile {
      tax_id: "5417000001".to_string(),
      legal_name: "Tasca do Leo, Lda".to_string(),
      street: "Rua da Missao 12".to_string(),
      city: "Luanda".to_string(),
      country: "AO".to_string(),
      software_cert_number: "318/AGT/2024".to_string(),
      currency: Currency::AOA,
    }
  }

  #[tokio::test]
  async fn test_export_covers_current_period_sealings() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let customers = Arc::new(InMemoryCustomerRepository::new());
    let dishes = Arc::new(InMemoryDishRepository::new());

    let ledger = InvoiceLedger::open(
      store.clone(),
      customers.clone(),
      SeriesId::new("VER2025".to_string()).unwrap(),
      Currency::AOA,
    )
    .await
    .unwrap();

    for price in [dec!(9500), dec!(8200), dec!(2000)] {
      let line = OrderLine::new(
        Uuid::new_v4(),
        "Prato do dia".to_string(),
        Quantity::new(dec!(1)).unwrap(),
        Money::new(price, Currency::AOA).unwrap(),
        Money::new(price / dec!(4), Currency::AOA).unwrap(),
        TaxRate::new(dec!(14)).unwrap(),
      )
      .unwrap();
      let order = Order::new(None, vec![line]).unwrap();
      ledger.seal(&order, PaymentMethod::Cash, None).await.unwrap();
    }

    let now = Utc::now();
    let use_case = ExportSaftUseCase::new(store, customers, dishes, company());
    let response = use_case
      .execute(ExportSaftCommand {
        year: now.year(),
        month: now.month(),
      })
      .await
      .unwrap();

    assert_eq!(response.entries, 3);
    assert_eq!(response.gross_total, dec!(19700));
    assert!(response.xml.contains("<NumberOfEntries>3</NumberOfEntries>"));
    assert!(response.xml.contains("<GrossTotal>9500.00</GrossTotal>"));
  }

  #[tokio::test]
  async fn test_export_empty_period_fails_explicitly() {
    let use_case = ExportSaftUseCase::new(
      Arc::new(InMemoryLedgerStore::new()),
      Arc::new(InMemoryCustomerRepository::new()),
      Arc::new(InMemoryDishRepository::new()),
      company(),
    );

    let result = use_case
      .execute(ExportSaftCommand {
        year: 2024,
        month: 2,
      })
      .await;
    assert!(matches!(result, Err(ExportError::EmptyPeriod { .. })));
  }

  #[tokio::test]
  async fn test_export_rejects_invalid_month() {
    let use_case = ExportSaftUseCase::new(
      Arc::new(InMemoryLedgerStore::new()),
      Arc::new(InMemoryCustomerRepository::new()),
      Arc::new(InMemoryDishRepository::new()),
      company(),
    );

    let result = use_case
      .execute(ExportSaftCommand {
        year: 2025,
        month: 13,
      })
      .await;
    assert!(matches!(result, Err(ExportError::InvalidPeriod(_))));
  }
}
