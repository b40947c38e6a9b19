pub mod builder;
pub mod document;
pub mod errors;
pub mod xml;

pub use builder::build;
pub use document::{
  AUDIT_FILE_VERSION, AuditPeriod, CompanyProfile, GENERIC_CONSUMER_ID, GENERIC_CONSUMER_TAX_ID,
  SaftDocument,
};
pub use errors::ExportError;
