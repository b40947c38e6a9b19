use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::fiscal::{
  Currency, FiscalError, InvoiceLedger, Money, Order, OrderLine, PaymentMethod, Quantity, TaxRate,
};

#[derive(Debug, Deserialize)]
pub struct SealOrderLineDto {
  pub dish_id: Uuid,
  pub description: String,
  pub quantity: Decimal,
  pub unit_price: Decimal,
  pub unit_cost: Decimal,
  pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SealOrderCommand {
  pub table: Option<String>,
  pub payment_method: String,
  pub customer_id: Option<Uuid>,
  pub line_items: Vec<SealOrderLineDto>,
}

#[derive(Debug, Serialize)]
pub struct SealOrderResponse {
  pub invoice_number: String,
  pub document_type: String,
  pub issued_at: DateTime<Utc>,
  pub gross_total: Decimal,
  pub tax_total: Decimal,
  pub hash: String,
}

pub struct SealOrderUseCase {
  ledger: Arc<InvoiceLedger>,
  currency: Currency,
}

impl SealOrderUseCase {
  pub fn new(ledger: Arc<InvoiceLedger>, currency: Currency) -> Self {
    Self { ledger, currency }
  }

  pub async fn execute(&self, command: SealOrderCommand) -> Result<SealOrderResponse, FiscalError> {
    let payment_method = PaymentMethod::from_str(&command.payment_method)?;

    let lines: Vec<OrderLine> = command
      .line_items
      .into_iter()
      .map(|item| {
        let quantity = Quantity::new(item.quantity)?;
        let unit_price = Money::new(item.unit_price, self.currency)?;
        let unit_cost = Money::new(item.unit_cost, self.currency)?;
        let tax_rate = TaxRate::new(item.tax_rate)?;
        OrderLine::new(
          item.dish_id,
          item.description,
          quantity,
          unit_price,
          unit_cost,
          tax_rate,
        )
      })
      .collect::<Result<Vec<_>, _>>()?;

    let order = Order::new(command.table, lines)?;
    let invoice = self
      .ledger
      .seal(&order, payment_method, command.customer_id)
      .await?;

    Ok(SealOrderResponse {
      invoice_number: invoice.number.to_string(),
      document_type: invoice.number.document_type().code().to_string(),
      issued_at: invoice.issued_at,
      gross_total: invoice.gross_total.amount,
      tax_total: invoice.tax_total.amount,
      hash: invoice.hash.value().to_string(),
    })
  }
}
