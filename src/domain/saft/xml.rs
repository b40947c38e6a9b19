use rust_decimal::Decimal;

use super::document::SaftDocument;

const XMLNS: &str = "urn:OECD:StandardAuditFile-Tax:AO_1.01_01";

fn escape(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&apos;"),
      _ => escaped.push(c),
    }
  }
  escaped
}

/// Monetary amounts and percentages are fixed to two decimals in the file.
fn fixed2(value: Decimal) -> String {
  format!("{:.2}", value.round_dp(2))
}

struct XmlWriter {
  buf: String,
  depth: usize,
}

impl XmlWriter {
  fn new() -> Self {
    Self {
      buf: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
      depth: 0,
    }
  }

  fn indent(&mut self) {
    for _ in 0..self.depth {
      self.buf.push_str("  ");
    }
  }

  fn open(&mut self, tag: &str) {
    self.indent();
    self.buf.push('<');
    self.buf.push_str(tag);
    self.buf.push_str(">\n");
    self.depth += 1;
  }

  fn open_with_attr(&mut self, tag: &str, attr: &str, value: &str) {
    self.indent();
    self.buf.push('<');
    self.buf.push_str(tag);
    self.buf.push(' ');
    self.buf.push_str(attr);
    self.buf.push_str("=\"");
    self.buf.push_str(&escape(value));
    self.buf.push_str("\">\n");
    self.depth += 1;
  }

  fn close(&mut self, tag: &str) {
    self.depth -= 1;
    self.indent();
    self.buf.push_str("</");
    self.buf.push_str(tag);
    self.buf.push_str(">\n");
  }

  fn elem(&mut self, tag: &str, text: &str) {
    self.indent();
    self.buf.push('<');
    self.buf.push_str(tag);
    self.buf.push('>');
    self.buf.push_str(&escape(text));
    self.buf.push_str("</");
    self.buf.push_str(tag);
    self.buf.push_str(">\n");
  }

  fn finish(self) -> String {
    self.buf
  }
}

impl SaftDocument {
  /// Serializes the document as the SAF-T (AO) `AuditFile` XML.
  pub fn to_xml(&self) -> String {
    let mut w = XmlWriter::new();
    w.open_with_attr("AuditFile", "xmlns", XMLNS);

    // Header
    w.open("Header");
    w.elem("AuditFileVersion", self.header.audit_file_version);
    w.elem("CompanyID", &self.header.company_tax_id);
    w.elem("TaxRegistrationNumber", &self.header.company_tax_id);
    w.elem("CompanyName", &self.header.company_name);
    w.open("CompanyAddress");
    w.elem("AddressDetail", &self.header.street);
    w.elem("City", &self.header.city);
    w.elem("Country", &self.header.country);
    w.close("CompanyAddress");
    w.elem("FiscalYear", &self.header.fiscal_year.to_string());
    w.elem("StartDate", &self.header.start_date.format("%Y-%m-%d").to_string());
    w.elem("EndDate", &self.header.end_date.format("%Y-%m-%d").to_string());
    w.elem("CurrencyCode", self.header.currency_code);
    w.elem(
      "DateCreated",
      &self.header.date_created.format("%Y-%m-%d").to_string(),
    );
    w.elem("SoftwareCertificateNumber", &self.header.software_cert_number);
    w.close("Header");

    // Master files
    w.open("MasterFiles");
    for customer in &self.master_files.customers {
      w.open("Customer");
      w.elem("CustomerID", &customer.customer_id);
      w.elem("CustomerTaxID", &customer.tax_id);
      w.elem("CompanyName", &customer.name);
      w.close("Customer");
    }
    for product in &self.master_files.products {
      w.open("Product");
      w.elem("ProductCode", &product.product_code);
      w.elem("ProductDescription", &product.description);
      w.close("Product");
    }
    w.open("TaxTable");
    for entry in &self.master_files.tax_table {
      w.open("TaxTableEntry");
      w.elem("TaxType", entry.tax_type);
      w.elem("TaxCode", &entry.tax_code);
      w.elem("TaxPercentage", &fixed2(entry.percentage));
      w.close("TaxTableEntry");
    }
    w.close("TaxTable");
    w.close("MasterFiles");

    // Source documents
    w.open("SourceDocuments");
    w.open("SalesInvoices");
    w.elem(
      "NumberOfEntries",
      &self.source_documents.number_of_entries.to_string(),
    );
    w.elem("TotalCredit", &fixed2(self.source_documents.total_credit));
    for invoice in &self.source_documents.invoices {
      w.open("Invoice");
      w.elem("InvoiceNo", &invoice.invoice_no);
      w.elem("InvoiceType", invoice.document_type);
      w.elem("InvoiceStatus", invoice.status);
      w.elem("Hash", &invoice.hash);
      w.elem(
        "InvoiceDate",
        &invoice.invoice_date.format("%Y-%m-%d").to_string(),
      );
      w.elem(
        "SystemEntryDate",
        &invoice
          .system_entry_date
          .format("%Y-%m-%dT%H:%M:%S")
          .to_string(),
      );
      w.elem("CustomerID", &invoice.customer_id);
      for line in &invoice.lines {
        w.open("Line");
        w.elem("LineNumber", &line.line_number.to_string());
        w.elem("ProductCode", &line.product_code);
        w.elem("Quantity", &line.quantity.to_string());
        w.elem("UnitPrice", &fixed2(line.unit_price));
        w.open("Tax");
        w.elem("TaxType", "IVA");
        w.elem("TaxPercentage", &fixed2(line.tax_percentage));
        w.close("Tax");
        w.elem("TaxAmount", &fixed2(line.tax_amount));
        w.elem("CreditAmount", &fixed2(line.credit_amount));
        w.close("Line");
      }
      w.open("DocumentTotals");
      w.elem("TaxPayable", &fixed2(invoice.totals.tax_payable));
      w.elem("NetTotal", &fixed2(invoice.totals.net_total));
      w.elem("GrossTotal", &fixed2(invoice.totals.gross_total));
      w.close("DocumentTotals");
      w.close("Invoice");
    }
    w.close("SalesInvoices");
    w.close("SourceDocuments");

    w.close("AuditFile");
    w.finish()
  }
}
