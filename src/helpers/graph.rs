use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    config::OAuthConfig,
    error::{ReportError, Result},
};

/// Sends mail through Microsoft Graph using an application (client-credentials) token.
#[derive(Clone)]
pub struct GraphMailer {
    client: Client,
    oauth: OAuthConfig,
    base_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub message: Message,
    pub save_to_sent_items: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub subject: String,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
    pub attachments: Vec<FileAttachment>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Serialize, Debug)]
pub struct EmailAddress {
    pub address: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub name: String,
    pub content_type: String,
    pub content_bytes: String,
}

impl SendMailRequest {
    pub fn new(
        subject: &str,
        text: &str,
        recipients: &[String],
        attachment_name: &str,
        content_type: &str,
        attachment: &[u8],
    ) -> Self {
        SendMailRequest {
            message: Message {
                subject: subject.to_string(),
                body: ItemBody {
                    content_type: "Text".to_string(),
                    content: text.to_string(),
                },
                to_recipients: recipients
                    .iter()
                    .map(|address| Recipient {
                        email_address: EmailAddress {
                            address: address.clone(),
                        },
                    })
                    .collect(),
                attachments: vec![FileAttachment {
                    odata_type: "#microsoft.graph.fileAttachment".to_string(),
                    name: attachment_name.to_string(),
                    content_type: content_type.to_string(),
                    content_bytes: STANDARD.encode(attachment),
                }],
            },
            save_to_sent_items: true,
        }
    }
}

impl GraphMailer {
    pub fn new(client: Client, oauth: OAuthConfig, base_url: String) -> Self {
        info!("Creating Graph mailer for authority: {}", oauth.authority);
        Self {
            client,
            oauth,
            base_url,
        }
    }

    pub async fn acquire_token(&self) -> Result<String> {
        let url = format!("{}/oauth2/v2.0/token", self.oauth.authority);
        info!("Requesting client-credentials token from: {}", url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("scope", self.oauth.scope.as_str()),
        ];

        let response = match self.client.post(&url).form(&form).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    let status = resp.status();
                    let error_text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    error!("Token endpoint returned status {}: {}", status, error_text);
                    return Err(ReportError::Auth(format!(
                        "token endpoint returned status {}: {}",
                        status, error_text
                    )));
                }
                resp
            }
            Err(e) => {
                error!("Failed to reach token endpoint: {}", e);
                return Err(ReportError::Auth(e.to_string()));
            }
        };

        match response.json::<TokenResponse>().await {
            Ok(token) => {
                info!("Access token acquired");
                Ok(token.access_token)
            }
            Err(e) => {
                error!("Failed to read token response: {}", e);
                Err(ReportError::Auth(format!("malformed token response: {}", e)))
            }
        }
    }

    /// Send `request` from the `sender` mailbox. Graph answers 202 with an empty body.
    pub async fn send_mail(&self, sender: &str, request: &SendMailRequest) -> Result<String> {
        let token = self.acquire_token().await?;
        let url = format!("{}/v1.0/users/{}/sendMail", self.base_url, sender);

        info!(
            "Sending mail via Graph as {} to {} recipient(s)",
            sender,
            request.message.to_recipients.len()
        );

        match self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    let error_text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    error!("Graph sendMail returned status {}: {}", status, error_text);
                    return Err(ReportError::Mail(format!(
                        "sendMail returned status {}: {}",
                        status, error_text
                    )));
                }
                info!("Email sent successfully: {}", status);
                Ok(format!("graph:{}", status.as_u16()))
            }
            Err(e) => {
                error!("Failed to send mail via Graph: {}", e);
                Err(ReportError::Mail(e.to_string()))
            }
        }
    }
}
