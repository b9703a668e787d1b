pub mod tally;
pub mod voucher;

pub use voucher::{AggregatedVoucher, VoucherKey, VoucherRecord};
