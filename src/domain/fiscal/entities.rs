use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{
  ChainHash, Currency, InvoiceNumber, Money, PaymentMethod, Quantity, TaxRate, ValueObjectError,
};

// Order Line - one priced dish on an open order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
  pub dish_id: Uuid,
  pub description: String,
  pub quantity: Quantity,
  pub unit_price: Money,
  pub unit_cost: Money,
  pub tax_rate: TaxRate,
}

impl OrderLine {
  pub fn new(
    dish_id: Uuid,
    description: String,
    quantity: Quantity,
    unit_price: Money,
    unit_cost: Money,
    tax_rate: TaxRate,
  ) -> Result<Self, ValueObjectError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDescription(
        "Line description cannot be empty".to_string(),
      ));
    }
    Ok(Self {
      dish_id,
      description: trimmed.to_string(),
      quantity,
      unit_price,
      unit_cost,
      tax_rate,
    })
  }

  pub fn subtotal(&self) -> Money {
    self.unit_price.multiply(self.quantity.value())
  }

  pub fn tax_amount(&self) -> Money {
    self.subtotal().multiply(self.tax_rate.as_multiplier())
  }

  pub fn cost(&self) -> Money {
    self.unit_cost.multiply(self.quantity.value())
  }
}

// Order - finalized, priced order handed over by the POS cart
//
// The ledger only reads it; open-order editing and table handling live in
// the POS layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub table: Option<String>,
  pub lines: Vec<OrderLine>,
  pub opened_at: DateTime<Utc>,
}

impl Order {
  /// Lines must all be priced and costed in one currency; the totals below
  /// rely on that invariant.
  pub fn new(table: Option<String>, lines: Vec<OrderLine>) -> Result<Self, ValueObjectError> {
    if let Some(first) = lines.first() {
      let currency = first.unit_price.currency;
      let uniform = lines
        .iter()
        .all(|line| line.unit_price.currency == currency && line.unit_cost.currency == currency);
      if !uniform {
        return Err(ValueObjectError::InvalidAmount(
          "Order lines must share one currency".to_string(),
        ));
      }
    }
    Ok(Self {
      id: Uuid::new_v4(),
      table,
      lines,
      opened_at: Utc::now(),
    })
  }

  pub fn gross_total(&self, currency: Currency) -> Money {
    self.lines.iter().fold(Money::zero(currency), |acc, line| {
      acc.add(&line.subtotal()).expect("Currency mismatch")
    })
  }

  pub fn tax_total(&self, currency: Currency) -> Money {
    self.lines.iter().fold(Money::zero(currency), |acc, line| {
      acc.add(&line.tax_amount()).expect("Currency mismatch")
    })
  }

  pub fn net_profit(&self, currency: Currency) -> Money {
    let cost = self.lines.iter().fold(Money::zero(currency), |acc, line| {
      acc.add(&line.cost()).expect("Currency mismatch")
    });
    let gross = self.gross_total(currency);
    // Costs are configured per dish and never exceed the sale price in a
    // priced order; clamp instead of going negative on bad catalog data.
    if cost.amount > gross.amount {
      Money::zero(currency)
    } else {
      Money {
        amount: gross.amount - cost.amount,
        currency,
      }
    }
  }
}

// Invoice Line - frozen copy of an order line at sealing time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
  pub dish_id: Uuid,
  pub description: String,
  pub quantity: Quantity,
  pub unit_price: Money,
  pub tax_rate: TaxRate,
  pub tax_amount: Money,
}

impl From<&OrderLine> for InvoiceLine {
  fn from(line: &OrderLine) -> Self {
    Self {
      dish_id: line.dish_id,
      description: line.description.clone(),
      quantity: line.quantity.clone(),
      unit_price: line.unit_price.clone(),
      tax_rate: line.tax_rate,
      tax_amount: line.tax_amount(),
    }
  }
}

// Closed Invoice - immutable once sealed
//
// Corrections are issued as new documents; no mutator exists on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedInvoice {
  pub number: InvoiceNumber,
  pub issued_at: DateTime<Utc>,
  pub lines: Vec<InvoiceLine>,
  pub gross_total: Money,
  pub tax_total: Money,
  pub net_profit: Money,
  pub payment_method: PaymentMethod,
  pub customer_id: Option<Uuid>,
  pub source_order: Uuid,
  pub table: Option<String>,
  pub hash: ChainHash,
}

impl ClosedInvoice {
  #[allow(clippy::too_many_arguments)]
  pub fn seal(
    order: &Order,
    number: InvoiceNumber,
    issued_at: DateTime<Utc>,
    payment_method: PaymentMethod,
    customer_id: Option<Uuid>,
    currency: Currency,
    previous: &ChainHash,
  ) -> Self {
    let gross_total = order.gross_total(currency);
    let hash = ChainHash::derive(&number, issued_at, &gross_total, previous);

    Self {
      number,
      issued_at,
      lines: order.lines.iter().map(InvoiceLine::from).collect(),
      gross_total,
      tax_total: order.tax_total(currency),
      net_profit: order.net_profit(currency),
      payment_method,
      customer_id,
      source_order: order.id,
      table: order.table.clone(),
      hash,
    }
  }

  /// Net total as exported: gross minus contained tax.
  pub fn net_total(&self) -> Money {
    Money {
      amount: self.gross_total.amount - self.tax_total.amount,
      currency: self.gross_total.currency,
    }
  }
}
