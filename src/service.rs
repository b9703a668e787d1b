use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::{fmt, sync::Arc};
use tracing::{error, info};

use crate::{
    config::ReportConfig,
    error::Result,
    helpers::{
        aggregate::aggregate_vouchers,
        email::MailDispatcher,
        tally::{self, build_export_request},
        xlsx::render_workbook,
    },
    models::VoucherRecord,
};

/// How one source endpoint fared during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub url: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Fetched { vouchers: usize },
    Failed { reason: String },
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            SourceOutcome::Fetched { vouchers } => {
                write!(f, "{}: {} voucher(s)", self.url, vouchers)
            }
            SourceOutcome::Failed { reason } => write!(f, "{}: failed ({})", self.url, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No source produced a voucher; nothing was rendered or sent.
    NothingToReport { sources: Vec<SourceReport> },
    Delivered {
        receipt: String,
        vouchers: usize,
        aggregated: usize,
        sources: Vec<SourceReport>,
    },
}

impl RunOutcome {
    pub fn sources(&self) -> &[SourceReport] {
        match self {
            RunOutcome::NothingToReport { sources } => sources,
            RunOutcome::Delivered { sources, .. } => sources,
        }
    }
}

/// Fetches vouchers from every configured source, aggregates them,
/// renders the workbook and mails it.
#[derive(Clone)]
pub struct ReportService {
    pub tally_client: Client,
    pub mailer: MailDispatcher,
    pub config: ReportConfig,
}

impl ReportService {
    pub fn new(tally_client: Client, mailer: MailDispatcher, config: ReportConfig) -> Self {
        info!("Creating new ReportService instance");
        Self {
            tally_client,
            mailer,
            config,
        }
    }

    /// Build the service with its HTTP clients from configuration alone.
    pub fn from_config(config: ReportConfig) -> Result<Self> {
        let tally_client = tally::tally_client_init()?;
        let mailer = MailDispatcher::from_config(Client::new(), &config.mail);
        Ok(Self::new(tally_client, mailer, config))
    }

    /// Create an Axum router for the report service
    pub fn router(self) -> Router {
        info!("Creating report service router");
        let shared_state = Arc::new(self);

        Router::new()
            .route("/process", post(process))
            .route("/health", get(health))
            .with_state(shared_state)
    }

    /// Collect vouchers from every source in configuration order, skipping failed sources.
    pub async fn collect_vouchers(&self) -> (Vec<VoucherRecord>, Vec<SourceReport>) {
        let request = build_export_request(&self.config.period);
        let mut all_vouchers = Vec::new();
        let mut sources = Vec::with_capacity(self.config.sources.len());

        for url in &self.config.sources {
            let outcome = match tally::fetch_vouchers(&self.tally_client, url, &request).await {
                Ok(vouchers) => {
                    let count = vouchers.len();
                    all_vouchers.extend(vouchers);
                    SourceOutcome::Fetched { vouchers: count }
                }
                Err(e) => {
                    error!("Skipping source {}: {}", url, e);
                    SourceOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            sources.push(SourceReport {
                url: url.trim().to_string(),
                outcome,
            });
        }

        (all_vouchers, sources)
    }

    /// Run the pipeline once: fetch, aggregate, render, send.
    pub async fn process_report(&self) -> Result<RunOutcome> {
        info!(
            "Processing voucher report for {} to {} across {} source(s)",
            self.config.period.from,
            self.config.period.to,
            self.config.sources.len()
        );

        let (vouchers, sources) = self.collect_vouchers().await;
        for source in &sources {
            info!("Source summary: {}", source);
        }

        if vouchers.is_empty() {
            info!("No voucher entries found in any source, nothing to report");
            return Ok(RunOutcome::NothingToReport { sources });
        }

        let voucher_count = vouchers.len();
        let aggregated = aggregate_vouchers(vouchers);
        let workbook = render_workbook(&aggregated)?;
        let text = self.summary_text(voucher_count, aggregated.len(), &sources);

        let receipt = self
            .mailer
            .send_report(&self.config.mail, &text, workbook)
            .await?;

        info!("Report delivered with receipt: {}", receipt);
        Ok(RunOutcome::Delivered {
            receipt,
            vouchers: voucher_count,
            aggregated: aggregated.len(),
            sources,
        })
    }

    fn summary_text(&self, vouchers: usize, aggregated: usize, sources: &[SourceReport]) -> String {
        let mut text = format!(
            "Voucher report for {} to {}.\n{} voucher record(s) aggregated into {} row(s).\n\nSources:\n",
            self.config.period.from, self.config.period.to, vouchers, aggregated
        );
        for source in sources {
            text.push_str(&format!("- {}\n", source));
        }
        text
    }
}

// Route handlers
async fn process(State(service): State<Arc<ReportService>>) -> (StatusCode, String) {
    info!("Received report processing request");

    match service.process_report().await {
        Ok(RunOutcome::Delivered {
            receipt,
            aggregated,
            ..
        }) => {
            info!("Report processed successfully, receipt: {}", receipt);
            (
                StatusCode::OK,
                format!("Report sent with {} voucher(s)", aggregated),
            )
        }
        Ok(RunOutcome::NothingToReport { .. }) => {
            (StatusCode::OK, "No vouchers to report".to_string())
        }
        Err(e) => {
            error!("Failed to process report: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing report".to_string(),
            )
        }
    }
}

async fn health() -> &'static str {
    "OK"
}
