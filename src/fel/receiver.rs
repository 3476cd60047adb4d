//! Receiver identity resolved from a ledger contact.

use crate::fel::country::country_code;
use crate::fel::model::{Contact, CustomField};

/// Receiver id used for final consumers and all export documents.
pub const FINAL_CONSUMER_ID: &str = "CF";

/// Receiver name used when the contact has none.
pub const FINAL_CONSUMER_NAME: &str = "Consumidor Final";

/// Label fragments that mark a tax id field.
pub const TAX_ID_LABEL_MARKERS: &[&str] = &["NIT", "ID DE EMPRESA"];

/// Exact labels that mark a tax id field.
pub const TAX_ID_LABELS: &[&str] = &[
    "TAX ID",
    "TAX NUMBER",
    "NUMERO FISCAL",
    "ID FISCAL",
    "RFC",
    "RUC",
    "RUT",
    "ID EMPRESA",
];

/// Tax id values that don't count as an identifier when scanning custom fields.
pub const NOT_APPLICABLE_VALUES: &[&str] = &["N/A", "CF"];

/// Sanitized tax id values meaning final consumer.
pub const FINAL_CONSUMER_VALUES: &[&str] = &["CF", "C/F", "CONSUMIDORFINAL", "CONSUMIDOR FINAL", "N/A"];

/// Exact labels holding the legal name.
pub const LEGAL_NAME_LABELS: &[&str] = &["NOMBRE A FACTURAR", "RAZON SOCIAL", "NOMBRE FISCAL"];

/// Country values, lower-case, treated as Guatemala. Empty also counts.
pub const DOMESTIC_COUNTRY_ALIASES: &[&str] = &["guatemala", "gt", "gua"];

pub const DEFAULT_STREET: &str = "Ciudad";
pub const DEFAULT_POSTAL_CODE: &str = "01001";
pub const DEFAULT_CITY: &str = "Guatemala";
pub const DEFAULT_DEPARTMENT: &str = "Guatemala";

/// Tax treatment of a document, decided once from the receiver's country.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jurisdiction {
    Domestic,
    Export,
}

impl Jurisdiction {
    #[must_use]
    pub fn from_country(country: &str) -> Self {
        let country = country.trim().to_lowercase();
        if country.is_empty() || DOMESTIC_COUNTRY_ALIASES.contains(&country.as_str()) {
            Self::Domestic
        } else {
            Self::Export
        }
    }

    #[must_use]
    pub const fn is_export(self) -> bool {
        matches!(self, Self::Export)
    }
}

/// Which custom fields a label lookup selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    TaxId,
    LegalName,
}

impl LabelKind {
    /// Check a raw field label against this kind.
    #[must_use]
    pub fn matches(self, label: &str) -> bool {
        let label = label.trim().to_uppercase();
        match self {
            Self::TaxId => {
                TAX_ID_LABEL_MARKERS.iter().any(|marker| label.contains(marker))
                    || TAX_ID_LABELS.contains(&label.as_str())
            }
            Self::LegalName => LEGAL_NAME_LABELS.contains(&label.as_str()),
        }
    }
}

/// Values of the fields whose label matches, in declaration order.
pub fn labeled_values(fields: &[CustomField], kind: LabelKind) -> impl Iterator<Item = String> + '_ {
    fields
        .iter()
        .filter(move |field| kind.matches(&field.label))
        .map(CustomField::value_text)
}

fn is_not_applicable(value: &str) -> bool {
    let value = value.trim().to_uppercase();
    value.is_empty() || NOT_APPLICABLE_VALUES.contains(&value.as_str())
}

/// Keep alphanumerics and `-`, upper-cased.
#[must_use]
pub fn sanitize_tax_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_uppercase()
}

/// Raw tax id before sanitizing: the first usable labeled value, else the generic field.
fn raw_tax_id(contact: &Contact) -> String {
    labeled_values(&contact.custom_fields, LabelKind::TaxId)
        .find(|value| !is_not_applicable(value))
        .unwrap_or_else(|| contact.tax_number.clone())
}

/// Resolve the receiver's tax id, `CF` for final consumers.
#[must_use]
pub fn resolve_tax_id(contact: &Contact) -> String {
    let tax_id = sanitize_tax_id(&raw_tax_id(contact));
    if tax_id.is_empty() || FINAL_CONSUMER_VALUES.contains(&tax_id.as_str()) {
        FINAL_CONSUMER_ID.to_string()
    } else {
        tax_id
    }
}

/// Resolve the legal name: labeled custom field, then display name, then final consumer.
#[must_use]
pub fn resolve_legal_name(contact: &Contact) -> String {
    let labeled = labeled_values(&contact.custom_fields, LabelKind::LegalName)
        .next()
        .unwrap_or_default();
    [labeled.trim(), contact.contact_name.trim()]
        .into_iter()
        .find(|name| !name.is_empty())
        .unwrap_or(FINAL_CONSUMER_NAME)
        .to_string()
}

/// Business name shown to the customer: labeled legal name, then company name, then display name.
#[must_use]
pub fn resolve_business_name(contact: &Contact) -> String {
    let labeled = labeled_values(&contact.custom_fields, LabelKind::LegalName)
        .next()
        .unwrap_or_default();
    [labeled.trim(), contact.company_name.trim(), contact.contact_name.trim()]
        .into_iter()
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Receiver postal address with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverAddress {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub department: String,
    pub country: String,
}

impl ReceiverAddress {
    /// Single-line form used in the export complement.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!("{}, {}, {}", self.street, self.city, self.department)
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    let value = if value.is_empty() { default } else { value };
    value.to_string()
}

/// Receiver block of a fiscal document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    /// Id written to the document. Always `CF` for export.
    pub id: String,
    /// Resolved tax id regardless of jurisdiction.
    pub tax_id: String,
    pub name: String,
    pub email: String,
    pub address: ReceiverAddress,
    pub jurisdiction: Jurisdiction,
}

impl Receiver {
    #[must_use]
    pub fn from_contact(contact: &Contact) -> Self {
        let billing = &contact.billing_address;
        let jurisdiction = Jurisdiction::from_country(&billing.country);
        let tax_id = resolve_tax_id(contact);
        let id = if jurisdiction.is_export() {
            FINAL_CONSUMER_ID.to_string()
        } else {
            tax_id.clone()
        };

        Self {
            id,
            tax_id,
            name: resolve_legal_name(contact),
            email: contact.email.trim().to_string(),
            address: ReceiverAddress {
                street: or_default(&billing.address, DEFAULT_STREET),
                postal_code: or_default(&billing.zip, DEFAULT_POSTAL_CODE),
                city: or_default(&billing.city, DEFAULT_CITY),
                department: or_default(&billing.state, DEFAULT_DEPARTMENT),
                country: country_code(&billing.country).to_string(),
            },
            jurisdiction,
        }
    }

    #[must_use]
    pub fn is_final_consumer(&self) -> bool {
        self.id == FINAL_CONSUMER_ID
    }
}
