
use chrono::NaiveDate;
use tracing::info;

use crate::error::{ReportError, Result};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_ATTACHMENT_NAME: &str = "output.xlsx";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DATE_FORMAT: &str = "%Y%m%d";

/// Everything a report run needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub sources: Vec<String>,
    pub period: ReportPeriod,
    pub mail: MailConfig,
    pub bind_addr: String,
}

/// Inclusive date range requested from every source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ReportError::Config(format!(
                "report period starts after it ends ({} > {})",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Tally wants dates as `YYYYMMDD`.
    pub fn tally_from(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn tally_to(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub attachment_name: String,
    pub backend: MailBackendConfig,
}

#[derive(Clone, Debug)]
pub enum MailBackendConfig {
    Graph {
        oauth: OAuthConfig,
        base_url: String,
    },
    Resend {
        api_key: String,
    },
}

/// Client-credentials grant parameters for the mail API.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authority: String,
    pub client_secret: String,
    pub scope: String,
}

// Keep the secret out of logs and panic messages.
impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

impl ReportConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| ReportError::Config(format!("{} is not set", key)))
        };

        let sources = split_list(&required("TALLY_SOURCES")?);
        if sources.is_empty() {
            return Err(ReportError::Config(
                "TALLY_SOURCES lists no endpoints".to_string(),
            ));
        }

        let from = parse_date("REPORT_FROM", &required("REPORT_FROM")?)?;
        let to = parse_date("REPORT_TO", &required("REPORT_TO")?)?;
        let period = ReportPeriod::new(from, to)?;

        let recipients = split_list(&required("MAIL_RECIPIENTS")?);
        if recipients.is_empty() {
            return Err(ReportError::Config(
                "MAIL_RECIPIENTS lists no addresses".to_string(),
            ));
        }

        let backend = match get("MAIL_BACKEND").as_deref().unwrap_or("graph") {
            "graph" => {
                let authority = match get("AZURE_AUTHORITY") {
                    Some(authority) => authority.trim_end_matches('/').to_string(),
                    None => match get("AZURE_TENANT_ID") {
                        Some(tenant) => format!("{}/{}", AUTHORITY_HOST, tenant),
                        None => {
                            return Err(ReportError::Config(
                                "either AZURE_AUTHORITY or AZURE_TENANT_ID must be set"
                                    .to_string(),
                            ));
                        }
                    },
                };

                MailBackendConfig::Graph {
                    oauth: OAuthConfig {
                        client_id: required("AZURE_CLIENT_ID")?,
                        authority,
                        client_secret: required("AZURE_CLIENT_SECRET")?,
                        scope: get("GRAPH_SCOPE").unwrap_or_else(|| DEFAULT_GRAPH_SCOPE.to_string()),
                    },
                    base_url: get("GRAPH_BASE_URL")
                        .map(|url| url.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
                }
            }
            "resend" => MailBackendConfig::Resend {
                api_key: required("RESEND_API_KEY")?,
            },
            other => {
                return Err(ReportError::Config(format!(
                    "MAIL_BACKEND must be 'graph' or 'resend', got '{}'",
                    other
                )));
            }
        };

        let mail = MailConfig {
            sender: required("MAIL_SENDER")?,
            recipients,
            subject: get("MAIL_SUBJECT").unwrap_or_else(|| {
                format!("Voucher report {} to {}", period.from, period.to)
            }),
            attachment_name: get("MAIL_ATTACHMENT_NAME")
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string()),
            backend,
        };

        let config = ReportConfig {
            sources,
            period,
            mail,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        };

        info!(
            "Loaded configuration: {} source(s), period {} to {}",
            config.sources.len(),
            config.period.from,
            config.period.to
        );

        Ok(config)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| ReportError::Config(format!("{} must be YYYYMMDD, got '{}': {}", key, value, e)))
}
