//! Certification authority responses.

use serde::Deserialize;
use serde_json::Value;

use crate::fel::error::{Diagnostic, FelError};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Raw JSON response body from the authority.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorityResponse {
    #[serde(default)]
    pub resultado: Value,
    #[serde(default)]
    pub uuid: Value,
    #[serde(default)]
    pub serie: Value,
    #[serde(default)]
    pub numero: Value,
    #[serde(default)]
    pub fecha: Value,
    #[serde(default)]
    pub descripcion: Value,
    #[serde(default)]
    pub descripcion_errores: Value,
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

fn diagnostics(value: &Value) -> Vec<Diagnostic> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(map) => Diagnostic::new(
                map.get("categoria").map(text).unwrap_or_default(),
                map.get("mensaje_error").map(text).unwrap_or_default(),
            ),
            other => Diagnostic::new("", text(other)),
        })
        .collect()
}

/// Data of a successfully certified document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Certification {
    pub uuid: String,
    pub series: String,
    pub number: String,
    /// Certification timestamp as returned by the authority.
    pub certified_at: String,
    pub pdf_url: Option<String>,
    pub xml_url: Option<String>,
}

impl Certification {
    /// Ledger invoice number, when both series and number are known.
    #[must_use]
    pub fn invoice_number(&self) -> Option<String> {
        (!self.series.is_empty() && !self.number.is_empty())
            .then(|| format!("Serie: {} Numero de DTE: {}", self.series, self.number))
    }

    /// Day part of the certification timestamp, `YYYY-MM-DD`.
    #[must_use]
    pub fn certified_date(&self) -> Option<&str> {
        self.certified_at
            .split('T')
            .next()
            .filter(|date| !date.is_empty())
    }

    /// Name of the downloaded PDF file.
    #[must_use]
    pub fn pdf_file_name(&self) -> String {
        format!("FEL_{}_{}.pdf", self.series, self.number)
    }
}

/// Result of submitting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificationOutcome {
    Certified(Certification),
    Rejected {
        description: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl CertificationOutcome {
    /// Non-success HTTP status from the authority.
    #[must_use]
    pub fn transport_failure(status: u16, body: &str) -> Self {
        Self::Rejected {
            description: format!("Error HTTP {status}: {body}"),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_certified(&self) -> bool {
        matches!(self, Self::Certified(_))
    }

    /// Convert into a result, rejection becoming [`FelError::Rejected`].
    ///
    /// # Errors
    /// Returns the rejection description and diagnostics.
    pub fn into_result(self) -> Result<Certification, FelError> {
        match self {
            Self::Certified(certification) => Ok(certification),
            Self::Rejected {
                description,
                diagnostics,
            } => Err(FelError::Rejected {
                description,
                diagnostics,
            }),
        }
    }
}

/// Document URL served by the report endpoint for a UUID.
#[must_use]
pub fn report_url(base: &str, uuid: &str) -> String {
    format!("{base}?uuid={uuid}")
}

impl AuthorityResponse {
    /// Interpret the response. Document URLs are derived from `report_base_url`.
    #[must_use]
    pub fn into_outcome(self, report_base_url: &str) -> CertificationOutcome {
        if self.resultado != Value::Bool(true) {
            let description = text(&self.descripcion);
            return CertificationOutcome::Rejected {
                description: if description.is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    description
                },
                diagnostics: diagnostics(&self.descripcion_errores),
            };
        }

        let uuid = text(&self.uuid);
        let document_url = (!uuid.is_empty()).then(|| report_url(report_base_url, &uuid));
        CertificationOutcome::Certified(Certification {
            series: text(&self.serie),
            number: text(&self.numero),
            certified_at: text(&self.fecha),
            pdf_url: document_url.clone(),
            xml_url: document_url,
            uuid,
        })
    }
}

/// Parse a successful HTTP response body.
///
/// # Errors
/// Returns [`FelError::Parse`] if the body is not a JSON object.
pub fn parse_response(body: &str, report_base_url: &str) -> Result<CertificationOutcome, FelError> {
    let response: AuthorityResponse = serde_json::from_str(body)?;
    Ok(response.into_outcome(report_base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "https://report.example.com/documento";

    #[test]
    fn certified_response_with_numeric_number() {
        let body = r#"{
            "resultado": true,
            "uuid": "A1B2C3D4-1111-2222-3333-444455556666",
            "serie": "A1B2C3D4",
            "numero": 286401234,
            "fecha": "2026-03-02T09:15:07-06:00",
            "descripcion": "Documento certificado"
        }"#;
        let outcome = parse_response(body, REPORT).expect("valid response");
        let CertificationOutcome::Certified(certification) = outcome else {
            panic!("expected certification");
        };
        assert_eq!(certification.number, "286401234");
        assert_eq!(
            certification.pdf_url.as_deref(),
            Some("https://report.example.com/documento?uuid=A1B2C3D4-1111-2222-3333-444455556666")
        );
        assert_eq!(certification.xml_url, certification.pdf_url);
        assert_eq!(
            certification.invoice_number().as_deref(),
            Some("Serie: A1B2C3D4 Numero de DTE: 286401234")
        );
        assert_eq!(certification.certified_date(), Some("2026-03-02"));
        assert_eq!(certification.pdf_file_name(), "FEL_A1B2C3D4_286401234.pdf");
    }

    #[test]
    fn rejected_response_keeps_diagnostics_in_order() {
        let body = r#"{
            "resultado": false,
            "descripcion": "Errores en el documento",
            "descripcion_errores": [
                {"categoria": "SAT", "mensaje_error": "NIT del receptor no válido"},
                {"categoria": "Esquema", "mensaje_error": "Falta Descripcion"},
                "error sin formato"
            ]
        }"#;
        let outcome = parse_response(body, REPORT).expect("valid response");
        assert_eq!(
            outcome,
            CertificationOutcome::Rejected {
                description: "Errores en el documento".to_string(),
                diagnostics: vec![
                    Diagnostic::new("SAT", "NIT del receptor no válido"),
                    Diagnostic::new("Esquema", "Falta Descripcion"),
                    Diagnostic::new("", "error sin formato"),
                ],
            }
        );
    }

    #[test]
    fn missing_result_flag_is_a_rejection() {
        let outcome = parse_response("{}", REPORT).expect("valid response");
        assert!(!outcome.is_certified());
        let error = outcome.into_result().expect_err("rejected");
        assert_eq!(error.to_string(), "rejected by the authority: Unknown error");
    }

    #[test]
    fn invalid_body_is_a_parse_error() {
        assert!(matches!(parse_response("<html>", REPORT), Err(FelError::Parse(_))));
    }

    #[test]
    fn transport_failure_description() {
        let CertificationOutcome::Rejected { description, .. } = CertificationOutcome::transport_failure(500, "boom")
        else {
            panic!("expected rejection");
        };
        assert_eq!(description, "Error HTTP 500: boom");
    }

    #[test]
    fn no_invoice_number_without_series() {
        let certification = Certification {
            number: "1".to_string(),
            ..Certification::default()
        };
        assert_eq!(certification.invoice_number(), None);
        assert_eq!(certification.certified_date(), None);
    }
}
