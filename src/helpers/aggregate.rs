use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::models::{AggregatedVoucher, VoucherKey, VoucherRecord};

/// Merge records sharing a (date, voucher number, party) key, summing their amounts.
///
/// Output follows first-seen key order; every field except the amount comes from
/// the first record observed for its key.
pub fn aggregate_vouchers<I>(records: I) -> Vec<AggregatedVoucher>
where
    I: IntoIterator<Item = VoucherRecord>,
{
    let mut index: HashMap<VoucherKey, usize> = HashMap::new();
    let mut aggregated: Vec<AggregatedVoucher> = Vec::new();
    let mut seen = 0usize;

    for record in records {
        seen += 1;
        let amount = parse_amount(record.amount.as_deref());

        let position = *index.entry(record.key()).or_insert_with(|| {
            aggregated.push(AggregatedVoucher {
                voucher: record,
                amount: Decimal::ZERO,
            });
            aggregated.len() - 1
        });

        let entry = &mut aggregated[position];
        entry.amount = match entry.amount.checked_add(amount) {
            Some(sum) => sum,
            None => {
                // Clamp at the Decimal range instead of dropping or panicking.
                warn!(
                    "Amount overflow for voucher {} ({}), saturating total",
                    entry.voucher.voucher_number, entry.voucher.party_ledger_name
                );
                entry.amount.saturating_add(amount)
            }
        };
    }

    info!(
        "Aggregated {} voucher record(s) into {} voucher(s)",
        seen,
        aggregated.len()
    );

    aggregated
}

/// Lenient amount parsing: absent, blank or non-numeric text counts as zero.
pub fn parse_amount(raw: Option<&str>) -> Decimal {
    let Some(text) = raw.map(str::trim).filter(|text| !text.is_empty()) else {
        return Decimal::ZERO;
    };

    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .unwrap_or_else(|e| {
            debug!("Treating non-numeric amount '{}' as zero: {}", text, e);
            Decimal::ZERO
        })
}
