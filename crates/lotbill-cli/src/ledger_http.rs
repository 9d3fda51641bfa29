//! HTTP transport for the ledger API.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::debug;

use lotbill_core::error::UpstreamError;
use lotbill_core::ledger::{AuthContext, BillReceipt, LedgerTransport};
use lotbill_core::models::bill::Bill;
use lotbill_core::models::config::LedgerConfig;
use lotbill_core::models::document::SourceDocument;
use lotbill_core::retry::parse_retry_after;

/// Ledger client over `reqwest`.
pub struct HttpLedger {
    client: Client,
    base_url: String,
    tenant_header: String,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("lotbill/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant_header: config.tenant_header.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder, auth: &AuthContext) -> RequestBuilder {
        request
            .bearer_auth(&auth.access_token)
            .header(self.tenant_header.as_str(), auth.tenant_id.as_str())
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        let (code, message) = error_details(&body);
        let mut error = UpstreamError::http(
            status.as_u16(),
            message.unwrap_or_else(|| format!("ledger returned HTTP {}", status)),
        );
        if let Some(code) = code {
            error = error.with_code(code);
        }
        if let Some(delay) = retry_after {
            error = error.with_retry_after(delay);
        }

        debug!(status = status.as_u16(), error = %error, "ledger request failed");
        Err(error)
    }
}

impl LedgerTransport for HttpLedger {
    async fn create_bill(
        &self,
        auth: &AuthContext,
        bill: &Bill,
    ) -> Result<BillReceipt, UpstreamError> {
        let url = format!("{}/Invoices", self.base_url);
        let payload = serde_json::to_value(bill)
            .map_err(|e| UpstreamError::new(format!("bill could not be serialized: {}", e)))?;
        let request = self
            .authorized(self.client.post(&url), auth)
            .json(&json!({ "Invoices": [payload] }));

        let body: Value = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| {
                UpstreamError::unreadable_response(format!("unreadable ledger response: {}", e))
            })?;

        receipt_from(&body)
    }

    async fn attach_document(
        &self,
        auth: &AuthContext,
        bill_id: &str,
        document: &SourceDocument,
    ) -> Result<(), UpstreamError> {
        let url = format!("{}/Invoices/{}/Attachments", self.base_url, bill_id);
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type)
            .map_err(|e| {
                UpstreamError::new(format!("unsupported media type {}: {}", document.content_type, e))
            })?;
        let request = self
            .authorized(self.client.post(&url), auth)
            .multipart(Form::new().part("file", part));

        self.send(request).await?;
        Ok(())
    }
}

/// Map a `reqwest` failure that produced no response.
fn transport_error(e: reqwest::Error) -> UpstreamError {
    let error = UpstreamError::new(e.to_string());
    if e.is_timeout() {
        error.with_code("ETIMEDOUT")
    } else if e.is_connect() {
        error.with_code("ECONNREFUSED")
    } else {
        error
    }
}

/// Error code and message from a ledger error body.
fn error_details(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let text = body.trim();
        let message = (!text.is_empty()).then(|| text.chars().take(200).collect());
        return (None, message);
    };

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    let code = field(&["Type", "Title", "error"]);
    let message = field(&["Message", "Detail", "error_description", "message"]);
    (code, message)
}

/// Bill id and status from a create response.
fn receipt_from(body: &Value) -> Result<BillReceipt, UpstreamError> {
    let invoice = body
        .get("Invoices")
        .and_then(|v| v.get(0))
        .ok_or_else(|| UpstreamError::unreadable_response("ledger response has no Invoices"))?;

    let bill_id = invoice
        .get("InvoiceID")
        .and_then(Value::as_str)
        .ok_or_else(|| UpstreamError::unreadable_response("ledger response has no InvoiceID"))?;

    Ok(BillReceipt {
        bill_id: bill_id.to_string(),
        status: invoice
            .get("Status")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
