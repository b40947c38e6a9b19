use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::catalog::entities::{Customer, Dish};
use crate::domain::fiscal::entities::ClosedInvoice;

use super::document::{
  AUDIT_FILE_VERSION, AuditPeriod, CompanyProfile, GENERIC_CONSUMER_ID, GENERIC_CONSUMER_TAX_ID,
  Header, MasterFiles, SaftCustomer, SaftDocument, SaftInvoice, SaftLine, SaftProduct,
  SaftTaxEntry, SaftTotals, SourceDocuments,
};
use super::errors::ExportError;

fn tax_code(percentage: Decimal) -> String {
  if percentage == Decimal::from(14) {
    "NOR".to_string()
  } else if percentage.is_zero() {
    "ISE".to_string()
  } else {
    "OUT".to_string()
  }
}

/// Builds a SAF-T (AO) document for one fiscal period.
///
/// Pure transform over a snapshot of the invoice history: filtering, master
/// data deduplication and totals reconciliation happen here; serialization
/// and file IO stay outside.
pub fn build(
  invoices: &[ClosedInvoice],
  customers: &[Customer],
  dishes: &[Dish],
  company: &CompanyProfile,
  period: AuditPeriod,
) -> Result<SaftDocument, ExportError> {
  let in_period: Vec<&ClosedInvoice> = invoices
    .iter()
    .filter(|invoice| period.contains(invoice.issued_at))
    .collect();

  if in_period.is_empty() {
    return Err(ExportError::EmptyPeriod {
      year: period.year(),
      month: period.month(),
    });
  }

  let customer_index: HashMap<Uuid, &Customer> =
    customers.iter().map(|c| (c.id, c)).collect();
  let dish_index: HashMap<Uuid, &Dish> = dishes.iter().map(|d| (d.id, d)).collect();

  // Master data: first-appearance order, deduplicated
  let mut seen_customers: HashSet<String> = HashSet::new();
  let mut saft_customers: Vec<SaftCustomer> = Vec::new();
  let mut seen_products: HashSet<Uuid> = HashSet::new();
  let mut saft_products: Vec<SaftProduct> = Vec::new();
  let mut seen_rates: HashSet<Decimal> = HashSet::new();
  let mut tax_table: Vec<SaftTaxEntry> = Vec::new();

  for invoice in &in_period {
    let (customer_ref, tax_id, name) = match invoice.customer_id {
      Some(id) => match customer_index.get(&id) {
        Some(customer) => (
          id.to_string(),
          customer
            .tax_id
            .clone()
            .unwrap_or_else(|| GENERIC_CONSUMER_TAX_ID.to_string()),
          customer.name.clone(),
        ),
        None => (
          id.to_string(),
          GENERIC_CONSUMER_TAX_ID.to_string(),
          "Cliente desconhecido".to_string(),
        ),
      },
      None => (
        GENERIC_CONSUMER_ID.to_string(),
        GENERIC_CONSUMER_TAX_ID.to_string(),
        "Consumidor final".to_string(),
      ),
    };
    if seen_customers.insert(customer_ref.clone()) {
      saft_customers.push(SaftCustomer {
        customer_id: customer_ref,
        tax_id,
        name,
      });
    }

    for line in &invoice.lines {
      if seen_products.insert(line.dish_id) {
        let description = dish_index
          .get(&line.dish_id)
          .map(|dish| dish.name.clone())
          .unwrap_or_else(|| line.description.clone());
        saft_products.push(SaftProduct {
          product_code: line.dish_id.to_string(),
          description,
        });
      }
      let percentage = line.tax_rate.value();
      if seen_rates.insert(percentage) {
        tax_table.push(SaftTaxEntry {
          tax_type: "IVA",
          tax_code: tax_code(percentage),
          percentage,
        });
      }
    }
  }

  // Transactions, in chain order
  let mut total_credit = Decimal::ZERO;
  let mut saft_invoices: Vec<SaftInvoice> = Vec::with_capacity(in_period.len());

  for invoice in &in_period {
    let customer_ref = invoice
      .customer_id
      .map(|id| id.to_string())
      .unwrap_or_else(|| GENERIC_CONSUMER_ID.to_string());

    let lines = invoice
      .lines
      .iter()
      .enumerate()
      .map(|(index, line)| SaftLine {
        line_number: index + 1,
        product_code: line.dish_id.to_string(),
        quantity: line.quantity.value(),
        unit_price: line.unit_price.amount,
        tax_percentage: line.tax_rate.value(),
        tax_amount: line.tax_amount.amount,
        credit_amount: line.unit_price.amount * line.quantity.value(),
      })
      .collect();

    total_credit += invoice.gross_total.amount;
    saft_invoices.push(SaftInvoice {
      invoice_no: invoice.number.to_string(),
      document_type: invoice.number.document_type().code(),
      status: "N",
      invoice_date: invoice.issued_at.date_naive(),
      system_entry_date: invoice.issued_at,
      hash: invoice.hash.value().to_string(),
      customer_id: customer_ref,
      lines,
      totals: SaftTotals {
        tax_payable: invoice.tax_total.amount,
        net_total: invoice.net_total().amount,
        gross_total: invoice.gross_total.amount,
      },
    });
  }

  Ok(SaftDocument {
    header: Header {
      audit_file_version: AUDIT_FILE_VERSION,
      company_tax_id: company.tax_id.clone(),
      company_name: company.legal_name.clone(),
      street: company.street.clone(),
      city: company.city.clone(),
      country: company.country.clone(),
      fiscal_year: period.year(),
      start_date: period.start_date(),
      end_date: period.end_date(),
      currency_code: company.currency.as_str(),
      date_created: Utc::now(),
      software_cert_number: company.software_cert_number.clone(),
    },
    master_files: MasterFiles {
      customers: saft_customers,
      products: saft_products,
      tax_table,
    },
    source_documents: SourceDocuments {
      number_of_entries: saft_invoices.len(),
      total_credit,
      invoices: saft_invoices,
    },
  })
}
