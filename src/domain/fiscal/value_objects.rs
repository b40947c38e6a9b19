use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid series: {0}")]
  InvalidSeries(String),
  #[error("Invalid currency code: {0}")]
  InvalidCurrency(String),
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),
  #[error("Invalid quantity: {0}")]
  InvalidQuantity(String),
  #[error("Invalid tax rate: {0}")]
  InvalidTaxRate(String),
  #[error("Invalid payment method: {0}")]
  InvalidPaymentMethod(String),
  #[error("Invalid line description: {0}")]
  InvalidDescription(String),
}

// Invoice Series - e.g. "VER2025", configured once per fiscal year
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesId(String);

impl SeriesId {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidSeries(
        "Series cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 20 {
      return Err(ValueObjectError::InvalidSeries(
        "Series cannot exceed 20 characters".to_string(),
      ));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(ValueObjectError::InvalidSeries(
        "Series must be alphanumeric".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for SeriesId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Document Type - AGT document type codes
//
// FR (Factura/Recibo) documents a completed cash transaction; FT (Factura)
// documents a credit sale settled later against the customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
  FacturaRecibo,
  Factura,
}

impl DocumentType {
  pub fn for_payment(method: PaymentMethod) -> Self {
    if method.is_deferred() {
      DocumentType::Factura
    } else {
      DocumentType::FacturaRecibo
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      DocumentType::FacturaRecibo => "FR",
      DocumentType::Factura => "FT",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      DocumentType::FacturaRecibo => "Factura/Recibo",
      DocumentType::Factura => "Factura",
    }
  }
}

// Payment Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Cash,
  Multicaixa,
  Transfer,
  CustomerAccount,
}

impl PaymentMethod {
  /// A deferred sale does not represent a completed cash transaction;
  /// the amount stays open on the customer account.
  pub fn is_deferred(&self) -> bool {
    matches!(self, PaymentMethod::CustomerAccount)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cash => "cash",
      PaymentMethod::Multicaixa => "multicaixa",
      PaymentMethod::Transfer => "transfer",
      PaymentMethod::CustomerAccount => "customer_account",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "cash" => Ok(PaymentMethod::Cash),
      "multicaixa" => Ok(PaymentMethod::Multicaixa),
      "transfer" => Ok(PaymentMethod::Transfer),
      "customer_account" => Ok(PaymentMethod::CustomerAccount),
      _ => Err(ValueObjectError::InvalidPaymentMethod(format!(
        "Unknown payment method: {}",
        s
      ))),
    }
  }
}

// Currency - ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
  AOA,
  USD,
}

impl Currency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Currency::AOA => "AOA",
      Currency::USD => "USD",
    }
  }
}

impl FromStr for Currency {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "AOA" => Ok(Currency::AOA),
      "USD" => Ok(Currency::USD),
      _ => Err(ValueObjectError::InvalidCurrency(format!(
        "Unsupported currency: {}",
        s
      ))),
    }
  }
}

// Money - Amount with currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
  pub amount: Decimal,
  pub currency: Currency,
}

impl Money {
  pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValueObjectError> {
    if amount.is_sign_negative() {
      return Err(ValueObjectError::InvalidAmount(
        "Amount cannot be negative".to_string(),
      ));
    }
    Ok(Self { amount, currency })
  }

  pub fn zero(currency: Currency) -> Self {
    Self {
      amount: Decimal::ZERO,
      currency,
    }
  }

  pub fn add(&self, other: &Money) -> Result<Money, ValueObjectError> {
    if self.currency != other.currency {
      return Err(ValueObjectError::InvalidAmount(
        "Cannot add amounts with different currencies".to_string(),
      ));
    }
    Ok(Money {
      amount: self.amount + other.amount,
      currency: self.currency,
    })
  }

  pub fn multiply(&self, factor: Decimal) -> Money {
    Money {
      amount: self.amount * factor,
      currency: self.currency,
    }
  }

  /// Two-decimal fixed-point rendering, as required on fiscal documents.
  pub fn fixed2(&self) -> String {
    format!("{:.2}", self.amount.round_dp(2))
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.fixed2(), self.currency.as_str())
  }
}

// Quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value <= Decimal::ZERO {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity must be positive".to_string(),
      ));
    }
    // Max 3 decimal places (portions, weights)
    if value.scale() > 3 {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity cannot have more than 3 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

// Tax Rate - IVA percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value < Decimal::ZERO || value > Decimal::from(100) {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate must be between 0 and 100".to_string(),
      ));
    }
    if value.scale() > 2 {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate cannot have more than 2 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }

  pub fn as_multiplier(&self) -> Decimal {
    self.0 / Decimal::from(100)
  }
}

// Invoice Number - allocated, never user-supplied
//
// Renders as "FR VER2025/42": document type code, series, gapless sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumber {
  document_type: DocumentType,
  series: SeriesId,
  sequence: u64,
}

impl InvoiceNumber {
  pub fn new(document_type: DocumentType, series: SeriesId, sequence: u64) -> Self {
    Self {
      document_type,
      series,
      sequence,
    }
  }

  pub fn document_type(&self) -> DocumentType {
    self.document_type
  }

  pub fn series(&self) -> &SeriesId {
    &self.series
  }

  pub fn sequence(&self) -> u64 {
    self.sequence
  }
}

impl fmt::Display for InvoiceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {}/{}",
      self.document_type.code(),
      self.series,
      self.sequence
    )
  }
}

// Chain Hash - tamper-evident link between consecutive invoices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHash(String);

impl ChainHash {
  /// Sentinel for the first invoice of a ledger: the empty string.
  pub fn genesis() -> Self {
    Self(String::new())
  }

  pub fn from_stored(value: String) -> Self {
    Self(value)
  }

  /// Deterministic digest over the critical invoice fields and the previous
  /// link. Altering any past invoice invalidates every subsequent hash.
  pub fn derive(
    number: &InvoiceNumber,
    issued_at: DateTime<Utc>,
    gross_total: &Money,
    previous: &ChainHash,
  ) -> Self {
    let payload = format!(
      "{};{};{};{}",
      number,
      issued_at.to_rfc3339(),
      gross_total.fixed2(),
      previous.0
    );
    let digest = Sha256::digest(payload.as_bytes());
    Self(hex::encode(digest))
  }

  pub fn is_genesis(&self) -> bool {
    self.0.is_empty()
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ChainHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_series_id() {
    assert!(SeriesId::new("VER2025".to_string()).is_ok());
    assert!(SeriesId::new("".to_string()).is_err());
    assert!(SeriesId::new("VER 2025".to_string()).is_err());
    assert_eq!(SeriesId::new(" A1 ".to_string()).unwrap().value(), "A1");
  }

  #[test]
  fn test_document_type_for_payment() {
    assert_eq!(
      DocumentType::for_payment(PaymentMethod::Cash),
      DocumentType::FacturaRecibo
    );
    assert_eq!(
      DocumentType::for_payment(PaymentMethod::Multicaixa),
      DocumentType::FacturaRecibo
    );
    assert_eq!(
      DocumentType::for_payment(PaymentMethod::CustomerAccount),
      DocumentType::Factura
    );
  }

  #[test]
  fn test_payment_method_parsing() {
    assert_eq!(
      PaymentMethod::from_str("multicaixa").unwrap(),
      PaymentMethod::Multicaixa
    );
    assert_eq!(
      PaymentMethod::from_str("CUSTOMER_ACCOUNT").unwrap(),
      PaymentMethod::CustomerAccount
    );
    assert!(PaymentMethod::from_str("cheque").is_err());
    assert!(PaymentMethod::CustomerAccount.is_deferred());
    assert!(!PaymentMethod::Cash.is_deferred());
  }

  #[test]
  fn test_money() {
    let money = Money::new(dec!(17700), Currency::AOA).unwrap();
    assert_eq!(money.fixed2(), "17700.00");
    assert!(Money::new(dec!(-10), Currency::AOA).is_err());

    let other = Money::new(dec!(2000), Currency::AOA).unwrap();
    assert_eq!(money.add(&other).unwrap().amount, dec!(19700));

    let usd = Money::new(dec!(5), Currency::USD).unwrap();
    assert!(money.add(&usd).is_err());
  }

  #[test]
  fn test_quantity_and_tax_rate() {
    assert!(Quantity::new(dec!(2)).is_ok());
    assert!(Quantity::new(dec!(0)).is_err());
    assert!(Quantity::new(dec!(0.1234)).is_err());

    assert!(TaxRate::new(dec!(14)).is_ok());
    assert!(TaxRate::new(dec!(101)).is_err());
    assert_eq!(TaxRate::new(dec!(14)).unwrap().as_multiplier(), dec!(0.14));
  }

  #[test]
  fn test_invoice_number_format() {
    let number = InvoiceNumber::new(
      DocumentType::FacturaRecibo,
      SeriesId::new("VER2025".to_string()).unwrap(),
      42,
    );
    assert_eq!(number.to_string(), "FR VER2025/42");
  }

  #[test]
  fn test_chain_hash_determinism() {
    let number = InvoiceNumber::new(
      DocumentType::FacturaRecibo,
      SeriesId::new("VER2025".to_string()).unwrap(),
      1,
    );
    let issued_at = Utc::now();
    let gross = Money::new(dec!(17700), Currency::AOA).unwrap();

    let first = ChainHash::derive(&number, issued_at, &gross, &ChainHash::genesis());
    let second = ChainHash::derive(&number, issued_at, &gross, &ChainHash::genesis());
    assert_eq!(first, second);
    assert_eq!(first.value().len(), 64);

    // Any input change produces a different link
    let altered = Money::new(dec!(17701), Currency::AOA).unwrap();
    let third = ChainHash::derive(&number, issued_at, &altered, &ChainHash::genesis());
    assert_ne!(first, third);

    // The previous link feeds the digest
    let chained = ChainHash::derive(&number, issued_at, &gross, &first);
    assert_ne!(first, chained);
  }

  #[test]
  fn test_genesis_hash() {
    assert!(ChainHash::genesis().is_genesis());
    assert!(!ChainHash::from_stored("abc".to_string()).is_genesis());
  }
}
