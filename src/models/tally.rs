// Response structs for Tally's XML export
use serde::Deserialize;

use crate::models::voucher::VoucherRecord;

#[derive(Deserialize, Debug, Default)]
pub struct Envelope {
    #[serde(rename = "BODY", default)]
    pub body: Option<Body>,
}

impl Envelope {
    /// Voucher records in document order; non-voucher messages are skipped.
    pub fn into_vouchers(self) -> Vec<VoucherRecord> {
        self.body
            .and_then(|body| body.data)
            .map(|data| data.messages)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| message.voucher)
            .map(VoucherRecord::from)
            .collect()
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Body {
    #[serde(rename = "DATA", default)]
    pub data: Option<Data>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Data {
    #[serde(rename = "TALLYMESSAGE", default)]
    pub messages: Vec<TallyMessage>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TallyMessage {
    #[serde(rename = "VOUCHER", default)]
    pub voucher: Option<VoucherXml>,
}

#[derive(Deserialize, Debug, Default)]
pub struct VoucherXml {
    #[serde(rename = "DATE", default)]
    pub date: Option<String>,
    #[serde(rename = "GUID", default)]
    pub guid: Option<String>,
    #[serde(rename = "NARRATION", default)]
    pub narration: Option<String>,
    #[serde(rename = "OBJECTUPDATEACTION", default)]
    pub object_update_action: Option<String>,
    #[serde(rename = "GSTREGISTRATION", default)]
    pub gst_registration: Option<GstRegistration>,
    #[serde(rename = "VOUCHERTYPENAME", default)]
    pub voucher_type_name: Option<String>,
    #[serde(rename = "PARTYLEDGERNAME", default)]
    pub party_ledger_name: Option<String>,
    #[serde(rename = "VOUCHERNUMBER", default)]
    pub voucher_number: Option<String>,
    #[serde(rename = "CMPGSTREGISTRATIONTYPE", default)]
    pub cmp_gst_registration_type: Option<String>,
    #[serde(rename = "CMPGSTSTATE", default)]
    pub cmp_gst_state: Option<String>,
    #[serde(rename = "NUMBERINGSTYLE", default)]
    pub numbering_style: Option<String>,
    #[serde(rename = "CSTFORMISSUETYPE", default)]
    pub cst_form_issue_type: Option<String>,
    #[serde(rename = "FBTPAYMENTTYPE", default)]
    pub fbt_payment_type: Option<String>,
    #[serde(rename = "PERSISTEDVIEW", default)]
    pub persisted_view: Option<String>,
    #[serde(rename = "VOUCHERKEY", default)]
    pub voucher_key: Option<String>,
    #[serde(rename = "ALLLEDGERENTRIES.LIST", default)]
    pub ledger_entries: Vec<LedgerEntry>,
}

/// `<GSTREGISTRATION TAXTYPE=".." TAXREGISTRATION="..">State Registration</GSTREGISTRATION>`
#[derive(Deserialize, Debug, Default)]
pub struct GstRegistration {
    #[serde(rename = "@TAXTYPE", default)]
    pub tax_type: Option<String>,
    #[serde(rename = "$text", default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LedgerEntry {
    #[serde(rename = "LEDGERNAME", default)]
    pub ledger_name: Option<String>,
    #[serde(rename = "AMOUNT", default)]
    pub amount: Option<String>,
}

impl From<VoucherXml> for VoucherRecord {
    fn from(xml: VoucherXml) -> Self {
        // Only the first ledger entry describes the party side of the voucher.
        let first_entry = xml.ledger_entries.into_iter().next().unwrap_or_default();

        VoucherRecord {
            date: xml.date.unwrap_or_default(),
            guid: xml.guid.unwrap_or_default(),
            narration: xml.narration.unwrap_or_default(),
            object_update_action: xml.object_update_action.unwrap_or_default(),
            gst_registration: xml
                .gst_registration
                .and_then(|registration| registration.name)
                .unwrap_or_default(),
            voucher_type_name: xml.voucher_type_name.unwrap_or_default(),
            party_ledger_name: xml.party_ledger_name.unwrap_or_default(),
            voucher_number: xml.voucher_number.unwrap_or_default(),
            cmp_gst_registration_type: xml.cmp_gst_registration_type.unwrap_or_default(),
            cmp_gst_state: xml.cmp_gst_state.unwrap_or_default(),
            numbering_style: xml.numbering_style.unwrap_or_default(),
            cst_form_issue_type: xml.cst_form_issue_type.unwrap_or_default(),
            fbt_payment_type: xml.fbt_payment_type.unwrap_or_default(),
            persisted_view: xml.persisted_view.unwrap_or_default(),
            voucher_key: xml.voucher_key.unwrap_or_default(),
            ledger_name: first_entry.ledger_name.unwrap_or_default(),
            amount: first_entry.amount.filter(|amount| !amount.trim().is_empty()),
        }
    }
}
