use reqwest::{header, Client};
use tracing::{error, info};

use crate::{
    config::ReportPeriod,
    error::{ReportError, Result},
    models::{tally::Envelope, VoucherRecord},
};

pub fn tally_client_init() -> Result<Client> {
    info!("Initializing Tally export client");

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/xml"),
    );

    match Client::builder().default_headers(headers).build() {
        Ok(client) => {
            info!("Tally export client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build Tally export client: {}", e);
            Err(ReportError::Config(format!("HTTP client could not be built: {}", e)))
        }
    }
}

/// Day Book export envelope for the given period, with vouchers exploded into ledger entries.
pub fn build_export_request(period: &ReportPeriod) -> String {
    let request = format!(
        r#"<ENVELOPE>
    <HEADER>
        <VERSION>1</VERSION>
        <TALLYREQUEST>Export</TALLYREQUEST>
        <TYPE>Data</TYPE>
        <ID>Day Book</ID>
    </HEADER>
    <BODY>
        <DESC>
            <STATICVARIABLES>
                <EXPLODEFLAG>Yes</EXPLODEFLAG>
                <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
            </STATICVARIABLES>
            <TDL>
                <TDLMESSAGE>
                    <REPORT NAME="Day Book" ISMODIFY="Yes">
                        <ADD>Set : SV From Date:"{from}"</ADD>
                        <ADD>Set : SV To Date:"{to}"</ADD>
                        <ADD>Set : ExplodeFlag : Yes</ADD>
                    </REPORT>
                </TDLMESSAGE>
            </TDL>
        </DESC>
    </BODY>
</ENVELOPE>"#,
        from = period.tally_from(),
        to = period.tally_to()
    );

    info!(
        "Built Day Book export request for {} to {}, length: {} chars",
        period.from,
        period.to,
        request.len()
    );
    request
}

/// POST the export request to one source and parse the voucher records it returns.
pub async fn fetch_vouchers(
    client: &Client,
    url: &str,
    request: &str,
) -> Result<Vec<VoucherRecord>> {
    let url = url.trim();
    info!("Fetching Day Book export from: {}", url);

    let response = match client.post(url).body(request.to_string()).send().await {
        Ok(resp) => {
            if !resp.status().is_success() {
                let status = resp.status();
                let error_text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!("{} returned error status {}: {}", url, status, error_text);
                return Err(ReportError::SourceStatus {
                    url: url.to_string(),
                    status,
                    body: error_text,
                });
            }
            resp
        }
        Err(e) => {
            error!("Failed to send export request to {}: {}", url, e);
            return Err(ReportError::Fetch {
                url: url.to_string(),
                source: e,
            });
        }
    };

    let text = match response.text().await {
        Ok(text) => {
            info!("Received {} chars from {}", text.len(), url);
            text
        }
        Err(e) => {
            error!("Failed to read response body from {}: {}", url, e);
            return Err(ReportError::Fetch {
                url: url.to_string(),
                source: e,
            });
        }
    };

    parse_export(url, &text)
}

pub fn parse_export(url: &str, xml: &str) -> Result<Vec<VoucherRecord>> {
    match quick_xml::de::from_str::<Envelope>(xml) {
        Ok(envelope) => {
            let vouchers = envelope.into_vouchers();
            info!("Parsed {} voucher(s) from {}", vouchers.len(), url);
            Ok(vouchers)
        }
        Err(e) => {
            error!("Failed to parse export from {}: {}", url, e);
            Err(ReportError::Parse {
                url: url.to_string(),
                source: e,
            })
        }
    }
}
