use std::io::stderr;
use std::process::exit;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use tally_voucher_report::{ReportConfig, ReportService, RunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment may already carry everything.
    let dotenv = dotenvy::dotenv();

    let log_level = std::env::var("LOG_LEVEL")
        .map(|s| parse_log_level(&s))
        .unwrap_or(LevelFilter::INFO);
    setup_logging(log_level);

    if let Err(e) = dotenv {
        warn!("No .env file loaded: {}", e);
    }

    let mode = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());

    if !matches!(mode.as_str(), "run" | "serve") {
        eprintln!("Usage: tally-voucher-report [run|serve]");
        eprintln!("Unknown mode '{}'", mode);
        exit(2);
    }

    let config = ReportConfig::from_env()?;
    let service = ReportService::from_config(config)?;

    if mode == "serve" {
        serve(service).await
    } else {
        run_once(service).await
    }
}

async fn run_once(service: ReportService) -> Result<()> {
    match service.process_report().await? {
        RunOutcome::Delivered {
            receipt,
            vouchers,
            aggregated,
            ..
        } => info!(
            "Delivered {} aggregated voucher(s) from {} record(s), receipt: {}",
            aggregated, vouchers, receipt
        ),
        RunOutcome::NothingToReport { .. } => info!("Nothing to report"),
    }
    Ok(())
}

async fn serve(service: ReportService) -> Result<()> {
    let bind_addr = service.config.bind_addr.clone();
    let app = service.router();

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::INFO
        }
    }
}

fn setup_logging(level: LevelFilter) {
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}
