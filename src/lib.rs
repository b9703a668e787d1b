//! Tally Voucher Report Library
//!
//! This library provides functionality for pulling Day Book vouchers out of Tally's
//! XML export endpoint, aggregating them per voucher, rendering them to an xlsx
//! workbook, and mailing the workbook.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::ReportConfig;
pub use error::ReportError;
pub use service::{ReportService, RunOutcome, SourceOutcome, SourceReport};

// Re-export key types for convenience
pub use helpers::aggregate::aggregate_vouchers;
pub use models::{AggregatedVoucher, VoucherKey, VoucherRecord};
