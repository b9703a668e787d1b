use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    routing::post,
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use tally_voucher_report::{
    config::{MailBackendConfig, MailConfig, OAuthConfig, ReportPeriod},
    helpers::{email::MailDispatcher, tally::tally_client_init},
    ReportConfig, ReportError, ReportService, RunOutcome, SourceOutcome,
};

const SOURCE_A: &str = r#"<ENVELOPE><BODY><DATA>
<TALLYMESSAGE><VOUCHER VCHTYPE="Sales">
 <DATE>20240401</DATE><VOUCHERNUMBER>1</VOUCHERNUMBER><PARTYLEDGERNAME>A</PARTYLEDGERNAME>
 <NARRATION>from a</NARRATION>
 <ALLLEDGERENTRIES.LIST><LEDGERNAME>A</LEDGERNAME><AMOUNT>100</AMOUNT></ALLLEDGERENTRIES.LIST>
</VOUCHER></TALLYMESSAGE>
<TALLYMESSAGE><VOUCHER VCHTYPE="Sales">
 <DATE>20240401</DATE><VOUCHERNUMBER>1</VOUCHERNUMBER><PARTYLEDGERNAME>A</PARTYLEDGERNAME>
 <ALLLEDGERENTRIES.LIST><LEDGERNAME>A</LEDGERNAME><AMOUNT>50</AMOUNT></ALLLEDGERENTRIES.LIST>
</VOUCHER></TALLYMESSAGE>
<TALLYMESSAGE><VOUCHER VCHTYPE="Sales">
 <DATE>20240401</DATE><VOUCHERNUMBER>1</VOUCHERNUMBER><PARTYLEDGERNAME>B</PARTYLEDGERNAME>
 <ALLLEDGERENTRIES.LIST><LEDGERNAME>B</LEDGERNAME><AMOUNT>10</AMOUNT></ALLLEDGERENTRIES.LIST>
</VOUCHER></TALLYMESSAGE>
</DATA></BODY></ENVELOPE>"#;

const SOURCE_B: &str = r#"<ENVELOPE><BODY><DATA>
<TALLYMESSAGE><VOUCHER VCHTYPE="Sales">
 <DATE>20240401</DATE><VOUCHERNUMBER>1</VOUCHERNUMBER><PARTYLEDGERNAME>A</PARTYLEDGERNAME>
 <ALLLEDGERENTRIES.LIST><LEDGERNAME>A</LEDGERNAME><AMOUNT>25</AMOUNT></ALLLEDGERENTRIES.LIST>
</VOUCHER></TALLYMESSAGE>
</DATA></BODY></ENVELOPE>"#;

const EMPTY_SOURCE: &str = "<ENVELOPE><BODY><DATA></DATA></BODY></ENVELOPE>";
const BROKEN_SOURCE: &str = "<ENVELOPE><BODY><DATA><TALLYMESSAGE></BODY></ENVELOPE>";

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<String>>>,
    mails: Arc<Mutex<Vec<(String, Value)>>>,
}

struct MockServer {
    base: String,
    state: MockState,
}

async fn spawn_mock() -> Result<MockServer> {
    let state = MockState::default();

    let app = Router::new()
        .route("/tally/a", post(source_a))
        .route("/tally/b", post(source_b))
        .route("/tally/empty", post(|| async { EMPTY_SOURCE }))
        .route("/tally/broken", post(|| async { BROKEN_SOURCE }))
        .route(
            "/tally/down",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "tally is offline") }),
        )
        .route("/tenant/oauth2/v2.0/token", post(token))
        .route(
            "/denied/oauth2/v2.0/token",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid_client") }),
        )
        .route("/v1.0/users/{sender}/sendMail", post(send_mail))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(MockServer { base, state })
}

async fn source_a(State(state): State<MockState>, body: String) -> &'static str {
    state.requests.lock().unwrap().push(body);
    SOURCE_A
}

async fn source_b(State(state): State<MockState>, body: String) -> &'static str {
    state.requests.lock().unwrap().push(body);
    SOURCE_B
}

async fn token(Form(form): Form<Vec<(String, String)>>) -> (StatusCode, Json<Value>) {
    let grant = form
        .iter()
        .find(|(key, _)| key == "grant_type")
        .map(|(_, value)| value.as_str());

    if grant != Some("client_credentials") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported_grant_type" })));
    }

    (
        StatusCode::OK,
        Json(json!({ "token_type": "Bearer", "expires_in": 3599, "access_token": "test-token" })),
    )
}

async fn send_mail(
    State(state): State<MockState>,
    Path(sender): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.mails.lock().unwrap().push((sender, body));
    StatusCode::ACCEPTED
}

fn config_for(mock: &MockServer, sources: &[&str], tenant: &str) -> ReportConfig {
    ReportConfig {
        sources: sources
            .iter()
            .map(|path| format!("{}{}", mock.base, path))
            .collect(),
        period: ReportPeriod {
            from: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        },
        mail: MailConfig {
            sender: "reports@example.com".to_string(),
            recipients: vec!["finance@example.com".to_string()],
            subject: "Voucher report".to_string(),
            attachment_name: "output.xlsx".to_string(),
            backend: MailBackendConfig::Graph {
                oauth: OAuthConfig {
                    client_id: "client".to_string(),
                    authority: format!("{}/{}", mock.base, tenant),
                    client_secret: "secret".to_string(),
                    scope: "https://graph.microsoft.com/.default".to_string(),
                },
                base_url: mock.base.clone(),
            },
        },
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

fn service_for(config: ReportConfig) -> Result<ReportService> {
    let mailer = MailDispatcher::from_config(reqwest::Client::new(), &config.mail);
    Ok(ReportService::new(tally_client_init()?, mailer, config))
}

#[tokio::test]
async fn test_vouchers_aggregate_across_sources_and_are_mailed() -> Result<()> {
    let mock = spawn_mock().await?;
    let service = service_for(config_for(
        &mock,
        &["/tally/a", "/tally/broken", "/tally/down", "/tally/b"],
        "tenant",
    ))?;

    let outcome = service.process_report().await?;

    let RunOutcome::Delivered {
        receipt,
        vouchers,
        aggregated,
        sources,
    } = outcome
    else {
        return Err(anyhow!("expected a delivered report"));
    };

    assert_eq!(receipt, "graph:202");
    assert_eq!(vouchers, 4);
    assert_eq!(aggregated, 2);
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[0].outcome, SourceOutcome::Fetched { vouchers: 3 });
    assert!(matches!(sources[1].outcome, SourceOutcome::Failed { .. }));
    assert!(matches!(sources[2].outcome, SourceOutcome::Failed { .. }));
    assert_eq!(sources[3].outcome, SourceOutcome::Fetched { vouchers: 1 });

    let requests = mock.state.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains(r#"SV From Date:"20240401""#));

    let mails = mock.state.mails.lock().unwrap().clone();
    assert_eq!(mails.len(), 1);
    let (sender, body) = &mails[0];
    assert_eq!(sender, "reports@example.com");

    let text = body["message"]["body"]["content"].as_str().unwrap_or_default();
    assert!(text.contains("4 voucher record(s) aggregated into 2 row(s)"));
    assert!(text.contains("/tally/down: failed"));

    let attachment = &body["message"]["attachments"][0];
    assert_eq!(attachment["name"], "output.xlsx");
    let bytes = STANDARD.decode(attachment["contentBytes"].as_str().unwrap_or_default())?;
    assert_eq!(&bytes[..2], b"PK");

    Ok(())
}

#[tokio::test]
async fn test_no_vouchers_means_nothing_is_sent() -> Result<()> {
    let mock = spawn_mock().await?;
    let service = service_for(config_for(
        &mock,
        &["/tally/empty", "/tally/broken", "/tally/down"],
        "tenant",
    ))?;

    let outcome = service.process_report().await?;

    assert!(matches!(outcome, RunOutcome::NothingToReport { .. }));
    assert_eq!(outcome.sources().len(), 3);
    assert_eq!(
        outcome.sources()[0].outcome,
        SourceOutcome::Fetched { vouchers: 0 }
    );
    assert!(mock.state.mails.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_token_failure_is_fatal() -> Result<()> {
    let mock = spawn_mock().await?;
    let service = service_for(config_for(&mock, &["/tally/a"], "denied"))?;

    let result = service.process_report().await;

    assert!(matches!(result, Err(ReportError::Auth(_))));
    assert!(mock.state.mails.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_health_returns_ok() -> Result<()> {
    let mock = spawn_mock().await?;
    let app = service_for(config_for(&mock, &["/tally/a"], "tenant"))?.router();

    let response = app
        .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"OK");

    Ok(())
}

#[tokio::test]
async fn test_unsupported_methods_are_rejected() -> Result<()> {
    let mock = spawn_mock().await?;
    let app = service_for(config_for(&mock, &["/tally/a"], "tenant"))?.router();

    let response = app
        .clone()
        .oneshot(Request::builder().method("PUT").uri("/process").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .oneshot(Request::builder().method("POST").uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    Ok(())
}

#[tokio::test]
async fn test_process_endpoint_reports_success_and_failure() -> Result<()> {
    let mock = spawn_mock().await?;

    let ok_app = service_for(config_for(&mock, &["/tally/a"], "tenant"))?.router();
    let response = ok_app
        .oneshot(Request::builder().method("POST").uri("/process").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let failing_app = service_for(config_for(&mock, &["/tally/a"], "denied"))?.router();
    let response = failing_app
        .oneshot(Request::builder().method("POST").uri("/process").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"Error processing report");

    Ok(())
}
