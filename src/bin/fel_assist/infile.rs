//! INFILE certification authority client.
//!
//! Certification and cancellation share one endpoint. The document type is
//! told apart by the XML root element.

use std::time::Duration;

use anyhow::{Context, Result};
use fel_tools::fel::{CertificationOutcome, FelError, result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::config::InfileConfig;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloaded document with its reported content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Download {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Check the content type or the `%PDF-` magic bytes.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type.to_lowercase().contains("pdf") || self.bytes.starts_with(b"%PDF-")
    }
}

/// Certification authority operations used by the workflow.
pub trait Certifier {
    /// Submit a document. HTTP failures are returned as a rejected outcome.
    async fn submit(&self, xml: &str, identifier: &str) -> Result<CertificationOutcome, FelError>;

    async fn download(&self, url: &str) -> Result<Download, FelError>;
}

/// INFILE API client.
#[derive(Debug)]
pub struct InfileClient {
    client: Client,
    config: InfileConfig,
}

impl InfileClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: InfileConfig) -> Result<Self> {
        let client = Client::builder().build().context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }
}

impl Certifier for InfileClient {
    async fn submit(&self, xml: &str, identifier: &str) -> Result<CertificationOutcome, FelError> {
        let response = self
            .client
            .post(&self.config.certification_url)
            .header(CONTENT_TYPE, "application/xml")
            .header("UsuarioFirma", &self.config.signing_user)
            .header("LlaveFirma", &self.config.signing_key)
            .header("UsuarioApi", &self.config.api_user)
            .header("LlaveApi", &self.config.api_key)
            .header("identificador", identifier)
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| FelError::Request(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FelError::Request(e.to_string()))?;

        if status == StatusCode::OK {
            result::parse_response(&body, &self.config.report_url)
        } else {
            Ok(CertificationOutcome::transport_failure(status.as_u16(), &body))
        }
    }

    async fn download(&self, url: &str) -> Result<Download, FelError> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| FelError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FelError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await.map_err(|e| FelError::Request(e.to_string()))?;

        Ok(Download {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
