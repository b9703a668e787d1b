use std::borrow::Cow;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{error, info, warn};

use crate::{error::Result, models::AggregatedVoucher};

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SHEET_NAME: &str = "Aggregated Data";

pub const COLUMNS: [&str; 17] = [
    "DATE",
    "GUID",
    "NARRATION",
    "OBJECTUPDATEACTION",
    "GSTREGISTRATION",
    "VOUCHERTYPENAME",
    "PARTYLEDGERNAME",
    "VOUCHERNUMBER",
    "CMPGSTREGISTRATIONTYPE",
    "CMPGSTSTATE",
    "NUMBERINGSTYLE",
    "CSTFORMISSUETYPE",
    "FBTPAYMENTTYPE",
    "PERSISTEDVIEW",
    "VOUCHERKEY",
    "LEDGERNAME",
    "AMOUNT",
];

const AMOUNT_COLUMN: u16 = 16;

/// Excel rejects cells holding more characters than this.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Render aggregated vouchers into a single-sheet xlsx workbook held in memory.
pub fn render_workbook(vouchers: &[AggregatedVoucher]) -> Result<Vec<u8>> {
    info!("Rendering {} aggregated voucher(s) to xlsx", vouchers.len());

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let amount_format = Format::new().set_num_format("0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }

    for (i, aggregated) in vouchers.iter().enumerate() {
        let row = i as u32 + 1;
        let v = &aggregated.voucher;
        let text_cells = [
            &v.date,
            &v.guid,
            &v.narration,
            &v.object_update_action,
            &v.gst_registration,
            &v.voucher_type_name,
            &v.party_ledger_name,
            &v.voucher_number,
            &v.cmp_gst_registration_type,
            &v.cmp_gst_state,
            &v.numbering_style,
            &v.cst_form_issue_type,
            &v.fbt_payment_type,
            &v.persisted_view,
            &v.voucher_key,
            &v.ledger_name,
        ];

        for (col, value) in text_cells.iter().enumerate() {
            worksheet.write_string(row, col as u16, cell_text(COLUMNS[col], value.as_str()))?;
        }

        // Decimal sums always fit an f64 cell at ledger magnitudes.
        let amount = aggregated.amount.to_f64().unwrap_or_default();
        worksheet.write_number_with_format(row, AMOUNT_COLUMN, amount, &amount_format)?;
    }

    worksheet.autofit();

    match workbook.save_to_buffer() {
        Ok(buffer) => {
            info!("Successfully rendered workbook, size: {} bytes", buffer.len());
            Ok(buffer)
        }
        Err(e) => {
            error!("Failed to render workbook: {}", e);
            Err(e.into())
        }
    }
}

fn cell_text<'a>(column: &str, value: &'a str) -> Cow<'a, str> {
    match value.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                "Truncating {} value of {} chars to {}",
                column,
                value.chars().count(),
                MAX_CELL_CHARS
            );
            Cow::Owned(value[..cut].to_string())
        }
        None => Cow::Borrowed(value),
    }
}
