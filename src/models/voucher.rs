use rust_decimal::Decimal;

/// One voucher line as exported by a source. Missing elements are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoucherRecord {
    pub date: String,
    pub guid: String,
    pub narration: String,
    pub object_update_action: String,
    pub gst_registration: String,
    pub voucher_type_name: String,
    pub party_ledger_name: String,
    pub voucher_number: String,
    pub cmp_gst_registration_type: String,
    pub cmp_gst_state: String,
    pub numbering_style: String,
    pub cst_form_issue_type: String,
    pub fbt_payment_type: String,
    pub persisted_view: String,
    pub voucher_key: String,
    pub ledger_name: String,
    /// Raw amount text of the first ledger entry, parsed only when aggregating.
    pub amount: Option<String>,
}

impl VoucherRecord {
    pub fn key(&self) -> VoucherKey {
        VoucherKey {
            date: self.date.clone(),
            voucher_number: self.voucher_number.clone(),
            party_ledger_name: self.party_ledger_name.clone(),
        }
    }
}

/// Identity of a logical voucher across duplicated source entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoucherKey {
    pub date: String,
    pub voucher_number: String,
    pub party_ledger_name: String,
}

/// A voucher with the summed amount of every record sharing its key.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedVoucher {
    pub voucher: VoucherRecord,
    pub amount: Decimal,
}
