use resend_rs::{
    types::{Attachment, CreateEmailBaseOptions},
    Resend,
};
use tracing::{error, info};

use crate::{
    config::{MailBackendConfig, MailConfig},
    error::Result,
    helpers::{
        graph::{GraphMailer, SendMailRequest},
        xlsx::XLSX_MIME_TYPE,
    },
};

/// Delivery route for the rendered report.
#[derive(Clone)]
pub enum MailDispatcher {
    Graph(GraphMailer),
    Resend(Resend),
}

impl MailDispatcher {
    pub fn from_config(client: reqwest::Client, config: &MailConfig) -> Self {
        match &config.backend {
            MailBackendConfig::Graph { oauth, base_url } => {
                info!("Using Microsoft Graph mail backend");
                MailDispatcher::Graph(GraphMailer::new(client, oauth.clone(), base_url.clone()))
            }
            MailBackendConfig::Resend { api_key } => {
                info!("Using Resend mail backend");
                MailDispatcher::Resend(Resend::new(api_key))
            }
        }
    }

    /// Send the workbook as the single attachment of one message; returns a delivery receipt.
    pub async fn send_report(
        &self,
        config: &MailConfig,
        text: &str,
        workbook: Vec<u8>,
    ) -> Result<String> {
        info!("Preparing report email with subject: {}", config.subject);
        info!("Report attachment size: {} bytes", workbook.len());

        match self {
            MailDispatcher::Graph(mailer) => {
                let request = SendMailRequest::new(
                    &config.subject,
                    text,
                    &config.recipients,
                    &config.attachment_name,
                    XLSX_MIME_TYPE,
                    &workbook,
                );
                mailer.send_mail(&config.sender, &request).await
            }
            MailDispatcher::Resend(resend) => {
                let email = CreateEmailBaseOptions::new(
                    config.sender.as_str(),
                    config.recipients.clone(),
                    config.subject.as_str(),
                )
                .with_text(text)
                .with_attachment(
                    Attachment::from_content(workbook)
                        .with_filename(&config.attachment_name)
                        .with_content_type(XLSX_MIME_TYPE),
                );

                match resend.emails.send(email).await {
                    Ok(response) => {
                        info!("Report email sent successfully with ID: {}", response.id);
                        Ok(response.id.to_string())
                    }
                    Err(e) => {
                        error!("Failed to send report email: {}", e);
                        Err(e.into())
                    }
                }
            }
        }
    }
}
