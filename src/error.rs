//! Error type shared by every stage of the report pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}: {body}")]
    SourceStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse export from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: quick_xml::de::DeError,
    },

    #[error("Failed to render workbook: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    #[error("Token acquisition failed: {0}")]
    Auth(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Resend delivery failed: {0}")]
    Resend(#[from] resend_rs::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
