pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{ClosedInvoice, InvoiceLine, Order, OrderLine};
pub use errors::FiscalError;
pub use ports::{BalanceCredit, CHAIN_HEAD_KEY, LedgerStore};
pub use services::{ChainVerdict, InvoiceLedger, verify_chain};
pub use value_objects::{
  ChainHash, Currency, DocumentType, InvoiceNumber, Money, PaymentMethod, Quantity, SeriesId,
  TaxRate, ValueObjectError,
};
