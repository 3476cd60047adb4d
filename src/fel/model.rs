//! Ledger records as returned by the accounting API.
//!
//! Only the fields the certification workflow reads are modeled.
//! Missing or `null` values fall back to their defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_currency() -> String {
    "GTQ".to_string()
}

/// Currency code, treating `null` and empty as quetzales.
fn currency_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let code = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    let code = code.trim();
    Ok(if code.is_empty() { default_currency() } else { code.to_uppercase() })
}

const fn default_quantity() -> Decimal {
    Decimal::ONE
}

/// Invoice as listed by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvoiceSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default = "default_currency", deserialize_with = "currency_or_default")]
    pub currency_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Decimal,
}

/// Full invoice detail.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Invoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default = "default_currency", deserialize_with = "currency_or_default")]
    pub currency_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_items: Vec<LineItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,
}

impl Invoice {
    /// Value of the custom field with exactly this label, if present and non-empty.
    #[must_use]
    pub fn custom_field(&self, label: &str) -> Option<String> {
        self.custom_fields
            .iter()
            .find(|field| field.label == label)
            .map(CustomField::value_text)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.status.eq_ignore_ascii_case("sent")
    }

    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.status.eq_ignore_ascii_case("draft")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineItem {
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    /// Unit rate without tax.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rate: Decimal,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            quantity: Decimal::ONE,
            rate: Decimal::ZERO,
            discount_amount: None,
            name: String::new(),
            description: String::new(),
        }
    }
}

/// Customer contact.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact_id: String,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    /// Generic tax number field.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tax_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub billing_address: Address,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub zip: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
}

/// Labeled custom field on an invoice or contact.
///
/// The ledger returns values as strings, numbers or `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default)]
    pub value: Value,
}

impl CustomField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Value::String(value.into()),
        }
    }

    /// Field value as text. `null` gives an empty string.
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
