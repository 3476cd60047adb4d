//! Zoho Books API client.
//!
//! Covers the invoice operations the certification workflow needs.
//! Every request carries the `organization_id` query parameter.
//!
//! Documentation:
//! <https://www.zoho.com/books/api/v3/invoices/>

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fel_tools::fel::{Contact, CustomField, FelError, Invoice, InvoiceSummary};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::BooksConfig;

/// Invoices requested per page when listing.
const PAGE_SIZE: usize = 200;

/// Invoice lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Sent,
    Void,
}

impl InvoiceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial invoice update. Zoho requires a `reason` when editing a sent invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceUpdate {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
}

/// Invoice email sent through the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to_mail_ids: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Ledger operations used by the workflow.
pub trait Ledger {
    async fn list_invoices(&self, status: &str) -> Result<Vec<InvoiceSummary>, FelError>;

    async fn invoice(&self, invoice_id: &str) -> Result<Invoice, FelError>;

    async fn contact(&self, contact_id: &str) -> Result<Contact, FelError>;

    async fn update_invoice(&self, invoice_id: &str, update: &InvoiceUpdate) -> Result<(), FelError>;

    async fn mark_status(&self, invoice_id: &str, status: InvoiceStatus) -> Result<(), FelError>;

    async fn email_invoice(&self, invoice_id: &str, message: &EmailMessage) -> Result<(), FelError>;

    async fn attach_file(&self, invoice_id: &str, path: &Path) -> Result<(), FelError>;
}

/// Zoho Books API client.
#[derive(Debug)]
pub struct ZohoBooksClient {
    client: Client,
    config: BooksConfig,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceListResponse {
    #[serde(default)]
    invoices: Vec<InvoiceSummary>,
    #[serde(default)]
    page_context: Option<PageContext>,
}

#[derive(Debug, Deserialize)]
struct PageContext {
    #[serde(default)]
    has_more_page: bool,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    invoice: Invoice,
}

#[derive(Debug, Deserialize)]
struct ContactResponse {
    contact: Contact,
}

fn request_error(error: &reqwest::Error) -> FelError {
    FelError::Request(error.to_string())
}

/// Read the response body, turning non-success statuses into transport errors.
async fn read_body(response: reqwest::Response) -> Result<String, FelError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| request_error(&e))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(FelError::Transport {
            status: status.as_u16(),
            body,
        })
    }
}

impl ZohoBooksClient {
    /// Create a new client. Call [`Self::authenticate`] before making requests.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BooksConfig) -> Result<Self> {
        let client = Client::builder().build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            config,
            access_token: None,
        })
    }

    /// Exchange the refresh token for an access token.
    ///
    /// # Errors
    /// Returns an error if the token request fails or returns no token.
    pub async fn authenticate(&mut self) -> Result<()> {
        let url = format!("{}/oauth/v2/token", self.config.accounts_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .form(&[
                ("refresh_token", self.config.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != StatusCode::OK {
            bail!("Authentication failed: HTTP {status} - {body}");
        }

        let token: TokenResponse = serde_json::from_str(&body).context("Failed to parse token response")?;
        match (token.access_token, token.error) {
            (Some(access_token), _) if !access_token.is_empty() => {
                self.access_token = Some(access_token);
                Ok(())
            }
            (_, Some(error)) => bail!("Authentication failed: {error}"),
            _ => bail!("Authentication failed: no access token in response"),
        }
    }

    /// Build the full API URL for the given path with the organization and extra query parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, FelError> {
        let base = format!("{}/books/v3/{path}", self.config.api_domain.trim_end_matches('/'));
        let query = std::iter::once(("organization_id", self.config.organization_id.as_str())).chain(params.iter().copied());
        Url::parse_with_params(&base, query).map_err(|e| FelError::Request(format!("Invalid URL {base}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, FelError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| FelError::Request("Not authenticated. Call authenticate() first.".to_string()))?;
        Ok(request.header(AUTHORIZATION, format!("Zoho-oauthtoken {token}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, FelError> {
        let url = self.build_url(path, params)?;
        let response = self
            .authorize(self.client.get(url))?
            .send()
            .await
            .map_err(|e| request_error(&e))?;
        let body = read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_json<T: Serialize>(&self, request: RequestBuilder, payload: Option<&T>) -> Result<(), FelError> {
        let mut request = self.authorize(request)?;
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_string(payload)?);
        }
        let response = request.send().await.map_err(|e| request_error(&e))?;
        read_body(response).await.map(|_| ())
    }
}

impl Ledger for ZohoBooksClient {
    async fn list_invoices(&self, status: &str) -> Result<Vec<InvoiceSummary>, FelError> {
        let per_page = PAGE_SIZE.to_string();
        let mut invoices = Vec::new();
        let mut page = 1_usize;
        loop {
            let page_number = page.to_string();
            let response: InvoiceListResponse = self
                .get_json(
                    "invoices",
                    &[("status", status), ("page", page_number.as_str()), ("per_page", per_page.as_str())],
                )
                .await?;
            invoices.extend(response.invoices);
            if !response.page_context.is_some_and(|context| context.has_more_page) {
                break;
            }
            page += 1;
        }
        Ok(invoices)
    }

    async fn invoice(&self, invoice_id: &str) -> Result<Invoice, FelError> {
        let response: InvoiceResponse = self.get_json(&format!("invoices/{invoice_id}"), &[]).await?;
        Ok(response.invoice)
    }

    async fn contact(&self, contact_id: &str) -> Result<Contact, FelError> {
        let response: ContactResponse = self.get_json(&format!("contacts/{contact_id}"), &[]).await?;
        Ok(response.contact)
    }

    async fn update_invoice(&self, invoice_id: &str, update: &InvoiceUpdate) -> Result<(), FelError> {
        let url = self.build_url(&format!("invoices/{invoice_id}"), &[])?;
        self.send_json(self.client.put(url), Some(update)).await
    }

    async fn mark_status(&self, invoice_id: &str, status: InvoiceStatus) -> Result<(), FelError> {
        let url = self.build_url(&format!("invoices/{invoice_id}/status/{status}"), &[])?;
        self.send_json::<()>(self.client.post(url), None).await
    }

    async fn email_invoice(&self, invoice_id: &str, message: &EmailMessage) -> Result<(), FelError> {
        let url = self.build_url(&format!("invoices/{invoice_id}/email"), &[])?;
        self.send_json(self.client.post(url), Some(message)).await
    }

    async fn attach_file(&self, invoice_id: &str, path: &Path) -> Result<(), FelError> {
        let url = self.build_url(&format!("invoices/{invoice_id}/attachment"), &[])?;

        let file_name = path.file_name().map_or_else(
            || "attachment.pdf".to_string(),
            |name| name.to_string_lossy().to_string(),
        );
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| request_error(&e))?;
        let form = Form::new().part("attachment", part);

        let response = self
            .authorize(self.client.post(url))?
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(&e))?;
        read_body(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use httpmock::Method::{GET, POST, PUT};
    use httpmock::MockServer;

    fn config(server: &MockServer) -> BooksConfig {
        BooksConfig {
            accounts_url: server.base_url(),
            api_domain: server.base_url(),
            organization_id: "700000001".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    async fn authenticated_client(server: &MockServer) -> ZohoBooksClient {
        let token = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/v2/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=refresh");
                then.status(200).body(r#"{"access_token": "token-123", "expires_in": 3600}"#);
            })
            .await;
        let mut client = ZohoBooksClient::new(config(server)).expect("client");
        client.authenticate().await.expect("authenticated");
        token.assert_async().await;
        client
    }

    #[tokio::test]
    async fn authentication_error_in_body_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/v2/token");
                then.status(200).body(r#"{"error": "invalid_code"}"#);
            })
            .await;
        let mut client = ZohoBooksClient::new(config(&server)).expect("client");
        let error = client.authenticate().await.expect_err("should fail");
        assert!(error.to_string().contains("invalid_code"));
    }

    #[tokio::test]
    async fn requests_before_authentication_fail() {
        let server = MockServer::start_async().await;
        let client = ZohoBooksClient::new(config(&server)).expect("client");
        assert!(matches!(client.invoice("1").await, Err(FelError::Request(_))));
    }

    #[tokio::test]
    async fn lists_invoices_across_pages() {
        let server = MockServer::start_async().await;
        let client = authenticated_client(&server).await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/books/v3/invoices")
                    .query_param("organization_id", "700000001")
                    .query_param("status", "draft")
                    .query_param("page", "1")
                    .header("Authorization", "Zoho-oauthtoken token-123");
                then.status(200).body(
                    r#"{"code": 0, "invoices": [{"invoice_id": "1", "invoice_number": "INV-1", "total": 100}],
                        "page_context": {"has_more_page": true}}"#,
                );
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/books/v3/invoices").query_param("page", "2");
                then.status(200).body(
                    r#"{"code": 0, "invoices": [{"invoice_id": "2", "invoice_number": "INV-2", "total": 50.5}],
                        "page_context": {"has_more_page": false}}"#,
                );
            })
            .await;

        let invoices = client.list_invoices("draft").await.expect("invoices");
        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[1].invoice_number, "INV-2");
    }

    #[tokio::test]
    async fn transport_error_keeps_status_and_body() {
        let server = MockServer::start_async().await;
        let client = authenticated_client(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/books/v3/contacts/42");
                then.status(404).body(r#"{"code": 1002, "message": "Contact does not exist."}"#);
            })
            .await;

        let error = client.contact("42").await.expect_err("should fail");
        let FelError::Transport { status, body } = error else {
            panic!("expected transport error, got {error:?}");
        };
        assert_eq!(status, 404);
        assert!(body.contains("Contact does not exist."));
    }

    #[tokio::test]
    async fn updates_invoice_with_json_body() {
        let server = MockServer::start_async().await;
        let client = authenticated_client(&server).await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/books/v3/invoices/1")
                    .query_param("organization_id", "700000001")
                    .header("Content-Type", "application/json")
                    .body_contains(r#""reason":"Anulacion FEL en SAT""#)
                    .body_contains(r#""custom_fields":[{"label":"fel_estado","value":"Anulada"}]"#);
                then.status(200).body(r#"{"code": 0}"#);
            })
            .await;

        let payload = InvoiceUpdate {
            reason: "Anulacion FEL en SAT".to_string(),
            custom_fields: vec![CustomField::new("fel_estado", "Anulada")],
            ..InvoiceUpdate::default()
        };
        client.update_invoice("1", &payload).await.expect("updated");
        update.assert_async().await;
    }

    #[tokio::test]
    async fn marks_status_and_uploads_attachment() {
        let server = MockServer::start_async().await;
        let client = authenticated_client(&server).await;
        let void = server
            .mock_async(|when, then| {
                when.method(POST).path("/books/v3/invoices/1/status/void");
                then.status(200).body(r#"{"code": 0}"#);
            })
            .await;
        let attachment = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/books/v3/invoices/1/attachment")
                    .body_contains("name=\"attachment\"")
                    .body_contains("FEL_A_1.pdf");
                then.status(200).body(r#"{"code": 0}"#);
            })
            .await;

        client.mark_status("1", InvoiceStatus::Void).await.expect("voided");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("FEL_A_1.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").expect("write pdf");
        client.attach_file("1", &path).await.expect("attached");

        void.assert_async().await;
        attachment.assert_async().await;
    }

    #[test]
    fn update_skips_empty_fields() {
        let update = InvoiceUpdate {
            reason: "x".to_string(),
            ..InvoiceUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).expect("json"), r#"{"reason":"x"}"#);
    }
}
