use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::ExportError;
use crate::domain::fiscal::value_objects::Currency;

/// Schema version declared in the export header.
pub const AUDIT_FILE_VERSION: &str = "1.01_01";

/// NIF substituted for customers without a registered tax id.
pub const GENERIC_CONSUMER_TAX_ID: &str = "999999999";

/// Customer reference used on invoices issued without a customer.
pub const GENERIC_CONSUMER_ID: &str = "CONSUMIDOR_FINAL";

// Company profile - settings-sourced header data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
  pub tax_id: String,
  pub legal_name: String,
  pub street: String,
  pub city: String,
  pub country: String,
  pub software_cert_number: String,
  pub currency: Currency,
}

// Audit Period - month/year filter, not a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPeriod {
  year: i32,
  month: u32,
}

impl AuditPeriod {
  pub fn new(year: i32, month: u32) -> Result<Self, ExportError> {
    if !(1..=12).contains(&month) {
      return Err(ExportError::InvalidPeriod(format!(
        "Month must be 1-12, got {}",
        month
      )));
    }
    if !(2000..=2100).contains(&year) {
      return Err(ExportError::InvalidPeriod(format!(
        "Year out of range: {}",
        year
      )));
    }
    Ok(Self { year, month })
  }

  pub fn year(&self) -> i32 {
    self.year
  }

  pub fn month(&self) -> u32 {
    self.month
  }

  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    instant.year() == self.year && instant.month() == self.month
  }

  pub fn start_date(&self) -> NaiveDate {
    NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated in constructor")
  }

  pub fn end_date(&self) -> NaiveDate {
    let (next_year, next_month) = if self.month == 12 {
      (self.year + 1, 1)
    } else {
      (self.year, self.month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
      .expect("validated in constructor")
      .pred_opt()
      .expect("first of month always has a predecessor")
  }
}

// --- Document sections ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
  pub audit_file_version: &'static str,
  pub company_tax_id: String,
  pub company_name: String,
  pub street: String,
  pub city: String,
  pub country: String,
  pub fiscal_year: i32,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub currency_code: &'static str,
  pub date_created: DateTime<Utc>,
  pub software_cert_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftCustomer {
  pub customer_id: String,
  pub tax_id: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftProduct {
  pub product_code: String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftTaxEntry {
  pub tax_type: &'static str,
  pub tax_code: String,
  pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterFiles {
  pub customers: Vec<SaftCustomer>,
  pub products: Vec<SaftProduct>,
  pub tax_table: Vec<SaftTaxEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftLine {
  pub line_number: usize,
  pub product_code: String,
  pub quantity: Decimal,
  pub unit_price: Decimal,
  pub tax_percentage: Decimal,
  pub tax_amount: Decimal,
  pub credit_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftTotals {
  pub tax_payable: Decimal,
  pub net_total: Decimal,
  pub gross_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftInvoice {
  pub invoice_no: String,
  pub document_type: &'static str,
  pub status: &'static str,
  pub invoice_date: NaiveDate,
  pub system_entry_date: DateTime<Utc>,
  pub hash: String,
  pub customer_id: String,
  pub lines: Vec<SaftLine>,
  pub totals: SaftTotals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocuments {
  pub number_of_entries: usize,
  pub total_credit: Decimal,
  pub invoices: Vec<SaftInvoice>,
}

/// Complete SAF-T (AO) audit file, ready for XML serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaftDocument {
  pub header: Header,
  pub master_files: MasterFiles,
  pub source_documents: SourceDocuments,
}
