//! Guatemalan FEL fiscal documents.
//!
//! Pure transformation of ledger invoices and contacts into the XML documents
//! accepted by the certification authority, plus parsing of its responses.
//! Nothing in this module performs I/O.

pub mod builder;
pub mod country;
pub mod document;
pub mod error;
pub mod model;
pub mod receiver;
pub mod result;
pub mod xml;

pub use builder::{
    build_cancellation, build_certification, compute_line, validate_final_consumer_limit, DOMESTIC_CURRENCY,
    FINAL_CONSUMER_LIMIT, VAT_RATE,
};
pub use document::{
    CancellationDocument, CertificationDocument, Emitter, EmitterAddress, FiscalDocument, LineEntry, Phrase,
    TaxableUnit,
};
pub use error::{Diagnostic, FelError};
pub use model::{Address, Contact, CustomField, Invoice, InvoiceSummary, LineItem};
pub use receiver::{Jurisdiction, Receiver};
pub use result::{AuthorityResponse, Certification, CertificationOutcome};

/// Persisted `fel_estado` value for a certified invoice.
pub const STATUS_CERTIFIED: &str = "Certificada";

/// Persisted `fel_estado` value for a canceled invoice.
pub const STATUS_CANCELED: &str = "Anulada";

/// Invoice custom field labels used to persist certification data.
pub mod fields {
    pub const UUID: &str = "fel_uuid";
    pub const SERIES: &str = "fel_serie";
    pub const NUMBER: &str = "fel_numero";
    pub const CERTIFIED_AT: &str = "fel_fecha_certificacion";
    pub const STATUS: &str = "fel_estado";
    pub const PDF_URL: &str = "fel_url_pdf";
    pub const XML_URL: &str = "fel_url_xml";
}
