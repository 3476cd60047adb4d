//! Fiscal document model produced by the builder.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::fel::error::FelError;
use crate::fel::receiver::{Jurisdiction, Receiver};
use crate::fel::xml;

/// Emitter fiscal identity, read from the user config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Emitter {
    /// Emitter tax id (NIT).
    #[serde(default)]
    pub tax_id: String,
    /// Registered legal name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commercial_name: String,
    /// VAT affiliation, e.g. `GEN`.
    #[serde(default = "default_vat_affiliation")]
    pub vat_affiliation: String,
    #[serde(default = "default_establishment_code")]
    pub establishment_code: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: EmitterAddress,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            tax_id: String::new(),
            name: String::new(),
            commercial_name: String::new(),
            vat_affiliation: default_vat_affiliation(),
            establishment_code: default_establishment_code(),
            email: String::new(),
            address: EmitterAddress::default(),
        }
    }
}

fn default_vat_affiliation() -> String {
    "GEN".to_string()
}

fn default_establishment_code() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmitterAddress {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub department: String,
    pub country: String,
}

impl Default for EmitterAddress {
    fn default() -> Self {
        Self {
            street: "Ciudad".to_string(),
            postal_code: "01001".to_string(),
            city: "Guatemala".to_string(),
            department: "Guatemala".to_string(),
            country: "GT".to_string(),
        }
    }
}

/// Legal phrase (`dte:Frase`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Phrase {
    pub phrase_type: String,
    pub scenario_code: String,
}

impl Phrase {
    pub fn new(phrase_type: impl Into<String>, scenario_code: impl Into<String>) -> Self {
        Self {
            phrase_type: phrase_type.into(),
            scenario_code: scenario_code.into(),
        }
    }
}

/// Tax treatment of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxableUnit {
    Taxed,
    Exempt,
}

impl TaxableUnit {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Taxed => "1",
            Self::Exempt => "2",
        }
    }
}

/// Computed line of a certification document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    /// Line number starting from 1.
    pub number: usize,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub description: String,
    /// Unit price, tax-inclusive for domestic documents.
    pub unit_price: Decimal,
    /// Quantity times unit price.
    pub price: Decimal,
    pub discount: Decimal,
    pub taxable_unit: TaxableUnit,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Export complement identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportComplement {
    pub consignee_name: String,
    pub consignee_address: String,
    pub buyer_name: String,
    pub buyer_address: String,
    pub buyer_code: String,
    pub exporter_name: String,
    pub exporter_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationDocument {
    pub issued_at: DateTime<FixedOffset>,
    pub currency: String,
    pub jurisdiction: Jurisdiction,
    pub emitter: Emitter,
    pub receiver: Receiver,
    pub phrases: Vec<Phrase>,
    pub lines: Vec<LineEntry>,
    /// Sum of line tax amounts.
    pub tax_total: Decimal,
    /// Sum of line totals.
    pub grand_total: Decimal,
    /// Present only for export documents.
    pub complement: Option<ExportComplement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDocument {
    /// Authority UUID of the document being canceled.
    pub document_id: String,
    /// Certification timestamp of the original document, as persisted.
    pub original_issue_date: String,
    pub emitter_tax_id: String,
    pub receiver_id: String,
    pub canceled_at: DateTime<FixedOffset>,
    pub reason: String,
}

/// Document sent to the certification authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiscalDocument {
    Certification(CertificationDocument),
    Cancellation(CancellationDocument),
}

impl FiscalDocument {
    /// Serialize the document to XML.
    ///
    /// # Errors
    /// Returns an error if the XML writer fails.
    pub fn to_xml(&self) -> Result<String, FelError> {
        let tree = match self {
            Self::Certification(document) => xml::certification_tree(document),
            Self::Cancellation(document) => xml::cancellation_tree(document),
        };
        xml::serialize(&tree)
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Certification(_) => "certification",
            Self::Cancellation(_) => "cancellation",
        }
    }
}

impl From<CertificationDocument> for FiscalDocument {
    fn from(document: CertificationDocument) -> Self {
        Self::Certification(document)
    }
}

impl From<CancellationDocument> for FiscalDocument {
    fn from(document: CancellationDocument) -> Self {
        Self::Cancellation(document)
    }
}
