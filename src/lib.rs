//! TascaPOS fiscal core.
//!
//! Gapless AGT invoice numbering, tamper-evident hash chaining over closed
//! invoices and SAF-T (AO) export. The POS front end, cart logic and
//! printing live elsewhere; this crate owns the integrity-critical path
//! between order checkout and the tax-audit file.

pub mod application;
pub mod domain;
pub mod infrastructure;
