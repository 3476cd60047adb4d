//! Builds fiscal documents from ledger records.
//!
//! Everything here is deterministic: the timestamp is passed in and
//! unresolvable fields degrade to their defaults instead of failing.
//! Only amounts too large to compute are refused.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fel::document::{
    CancellationDocument, CertificationDocument, Emitter, ExportComplement, LineEntry, Phrase, TaxableUnit,
};
use crate::fel::error::FelError;
use crate::fel::fields;
use crate::fel::model::{Contact, Invoice, LineItem};
use crate::fel::receiver::{FINAL_CONSUMER_ID, Jurisdiction, Receiver};

/// Domestic VAT rate.
pub const VAT_RATE: Decimal = dec!(0.12);

/// Largest total allowed for a domestic final-consumer invoice in quetzales.
pub const FINAL_CONSUMER_LIMIT: Decimal = dec!(2500.00);

pub const DOMESTIC_CURRENCY: &str = "GTQ";

/// Unit of measure for every line.
pub const UNIT_OF_MEASURE: &str = "UND";

/// Description used when a line has neither name nor description.
pub const DEFAULT_LINE_DESCRIPTION: &str = "Servicio";

pub const CANCELLATION_REASON: &str = "Anulacion";

/// Guatemala is UTC-6 all year.
const GUATEMALA_OFFSET_SECONDS: i32 = 6 * 3600;

/// The only phrase on export documents: exempt from VAT.
#[must_use]
pub fn export_phrase() -> Phrase {
    Phrase::new("4", "1")
}

/// Current time in Guatemala.
#[must_use]
pub fn guatemala_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::west_opt(GUATEMALA_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// Authority timestamp format, e.g. `2026-01-15T10:30:00-06:00`.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// `"name - description"`, or whichever is non-empty, or the default.
#[must_use]
pub fn line_description(item: &LineItem) -> String {
    let name = item.name.trim();
    let description = item.description.trim();
    match (name.is_empty(), description.is_empty()) {
        (false, false) => format!("{name} - {description}"),
        (false, true) => name.to_string(),
        (true, false) => description.to_string(),
        (true, true) => DEFAULT_LINE_DESCRIPTION.to_string(),
    }
}

fn out_of_range(number: usize) -> FelError {
    FelError::Policy(format!("Line {number} amounts are out of range"))
}

/// Compute one document line.
///
/// # Errors
/// Returns [`FelError::Policy`] when the line amounts overflow.
pub fn compute_line(item: &LineItem, jurisdiction: Jurisdiction, number: usize) -> Result<LineEntry, FelError> {
    let quantity = item.quantity;
    let rate = item.rate;
    let discount = item.discount_amount.unwrap_or_default();
    let taxable_amount = quantity
        .checked_mul(rate)
        .and_then(|gross| gross.checked_sub(discount))
        .ok_or_else(|| out_of_range(number))?;

    let (unit_price, tax_amount, taxable_unit) = match jurisdiction {
        Jurisdiction::Domestic => (
            rate.checked_mul(Decimal::ONE + VAT_RATE),
            taxable_amount.checked_mul(VAT_RATE),
            TaxableUnit::Taxed,
        ),
        Jurisdiction::Export => (Some(rate), Some(Decimal::ZERO), TaxableUnit::Exempt),
    };
    let (Some(unit_price), Some(tax_amount)) = (unit_price, tax_amount) else {
        return Err(out_of_range(number));
    };
    let price = quantity.checked_mul(unit_price).ok_or_else(|| out_of_range(number))?;
    let total = taxable_amount
        .checked_add(tax_amount)
        .ok_or_else(|| out_of_range(number))?;

    Ok(LineEntry {
        number,
        quantity,
        unit_of_measure: UNIT_OF_MEASURE.to_string(),
        description: line_description(item),
        unit_price,
        price,
        discount,
        taxable_unit,
        taxable_amount,
        tax_amount,
        total,
    })
}

/// Running sum that fails instead of overflowing.
fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal, FelError> {
    values
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| FelError::Policy("Document totals are out of range".to_string()))
}

/// Build the certification document for an invoice.
///
/// # Errors
/// Returns [`FelError::Policy`] when line amounts or totals overflow.
pub fn build_certification(
    invoice: &Invoice,
    contact: &Contact,
    emitter: &Emitter,
    phrases: &[Phrase],
    issued_at: DateTime<FixedOffset>,
) -> Result<CertificationDocument, FelError> {
    let receiver = Receiver::from_contact(contact);
    let jurisdiction = receiver.jurisdiction;

    let lines = invoice
        .line_items
        .iter()
        .enumerate()
        .map(|(index, item)| compute_line(item, jurisdiction, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let tax_total = checked_sum(lines.iter().map(|line| line.tax_amount))?;
    let grand_total = checked_sum(lines.iter().map(|line| line.total))?;

    let phrases = match jurisdiction {
        Jurisdiction::Export => vec![export_phrase()],
        Jurisdiction::Domestic => phrases.to_vec(),
    };

    let complement = jurisdiction.is_export().then(|| {
        let address = receiver.address.one_line();
        ExportComplement {
            consignee_name: receiver.name.clone(),
            consignee_address: address.clone(),
            buyer_name: receiver.name.clone(),
            buyer_address: address,
            buyer_code: FINAL_CONSUMER_ID.to_string(),
            exporter_name: emitter.name.trim().to_string(),
            exporter_code: emitter.tax_id.trim().to_string(),
        }
    });

    Ok(CertificationDocument {
        issued_at,
        currency: invoice.currency_code.clone(),
        jurisdiction,
        emitter: emitter.clone(),
        receiver,
        phrases,
        lines,
        tax_total,
        grand_total,
        complement,
    })
}

/// Build the cancellation document for a previously certified invoice.
#[must_use]
pub fn build_cancellation(
    invoice: &Invoice,
    contact: &Contact,
    emitter: &Emitter,
    canceled_at: DateTime<FixedOffset>,
) -> CancellationDocument {
    CancellationDocument {
        document_id: invoice.custom_field(fields::UUID).unwrap_or_default(),
        original_issue_date: invoice.custom_field(fields::CERTIFIED_AT).unwrap_or_default(),
        emitter_tax_id: emitter.tax_id.trim().to_string(),
        receiver_id: Receiver::from_contact(contact).id,
        canceled_at,
        reason: CANCELLATION_REASON.to_string(),
    }
}

/// Refuse domestic final-consumer invoices in quetzales above the legal limit.
///
/// # Errors
/// Returns [`FelError::Policy`] when the invoice needs the customer's tax id.
pub fn validate_final_consumer_limit(invoice: &Invoice, receiver: &Receiver) -> Result<(), FelError> {
    if receiver.is_final_consumer()
        && invoice.currency_code == DOMESTIC_CURRENCY
        && !receiver.jurisdiction.is_export()
        && invoice.total > FINAL_CONSUMER_LIMIT
    {
        return Err(FelError::Policy(format!(
            "Final consumer invoice total Q{} exceeds the Q{} limit. Set the tax id (NIT) of customer '{}' in Zoho Books",
            crate::format_amount(invoice.total),
            crate::format_amount(FINAL_CONSUMER_LIMIT),
            invoice.customer_name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use crate::fel::model::{Address, CustomField};

    fn issued_at() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(GUATEMALA_OFFSET_SECONDS)
            .expect("valid offset")
            .with_ymd_and_hms(2026, 3, 2, 9, 15, 0)
            .single()
            .expect("valid timestamp")
    }

    fn item(quantity: Decimal, rate: Decimal, discount: Option<Decimal>) -> LineItem {
        LineItem {
            quantity,
            rate,
            discount_amount: discount,
            name: "Consultoría".to_string(),
            description: String::new(),
        }
    }

    fn foreign_contact() -> Contact {
        Contact {
            contact_name: "Acme Corp".to_string(),
            billing_address: Address {
                address: "100 Main St".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                country: "United States".to_string(),
                ..Address::default()
            },
            ..Contact::default()
        }
    }

    #[test]
    fn domestic_line_includes_vat() {
        let line = compute_line(&item(dec!(3), dec!(50), Some(dec!(10))), Jurisdiction::Domestic, 1).expect("line");
        assert_eq!(line.unit_price, dec!(56));
        assert_eq!(line.price, dec!(168));
        assert_eq!(line.taxable_amount, dec!(140));
        assert_eq!(line.tax_amount, dec!(16.8));
        assert_eq!(line.total, dec!(156.8));
        assert_eq!(line.taxable_unit, TaxableUnit::Taxed);
    }

    #[test]
    fn export_line_is_exempt() {
        let line = compute_line(&item(dec!(2), dec!(100), None), Jurisdiction::Export, 4).expect("line");
        assert_eq!(line.number, 4);
        assert_eq!(line.unit_price, dec!(100));
        assert_eq!(line.tax_amount, Decimal::ZERO);
        assert_eq!(line.total, dec!(200));
        assert_eq!(line.taxable_unit.code(), "2");
    }

    #[test]
    fn descriptions() {
        let mut line_item = item(dec!(1), dec!(1), None);
        line_item.description = "Marzo".to_string();
        assert_eq!(line_description(&line_item), "Consultoría - Marzo");
        line_item.name.clear();
        assert_eq!(line_description(&line_item), "Marzo");
        line_item.description = "  ".to_string();
        assert_eq!(line_description(&line_item), "Servicio");
    }

    #[test]
    fn totals_come_from_lines_not_invoice() {
        let invoice = Invoice {
            total: dec!(999999),
            line_items: vec![item(dec!(1), dec!(10), None), item(dec!(2), dec!(5), Some(dec!(1)))],
            ..Invoice::default()
        };
        let document = build_certification(&invoice, &Contact::default(), &Emitter::default(), &[], issued_at())
            .expect("document");
        assert_eq!(document.tax_total, dec!(2.28));
        assert_eq!(document.grand_total, dec!(21.28));
    }

    #[test]
    fn export_document_has_complement_and_fixed_phrase() {
        let emitter = Emitter {
            tax_id: "12345678".to_string(),
            name: "Servicios Digitales, S.A.".to_string(),
            ..Emitter::default()
        };
        let configured = [Phrase::new("1", "1"), Phrase::new("2", "1")];
        let invoice = Invoice {
            currency_code: "USD".to_string(),
            line_items: vec![item(dec!(2), dec!(100), None)],
            ..Invoice::default()
        };
        let document = build_certification(&invoice, &foreign_contact(), &emitter, &configured, issued_at())
            .expect("document");

        assert_eq!(document.jurisdiction, Jurisdiction::Export);
        assert_eq!(document.phrases, vec![export_phrase()]);
        let complement = document.complement.expect("export complement");
        assert_eq!(complement.buyer_name, "Acme Corp");
        assert_eq!(complement.buyer_address, "100 Main St, Austin, TX");
        assert_eq!(complement.buyer_code, "CF");
        assert_eq!(complement.exporter_code, "12345678");
    }

    #[test]
    fn cancellation_uses_persisted_fields() {
        let invoice = Invoice {
            custom_fields: vec![
                CustomField::new(fields::UUID, "6F1A2B3C-0000-4000-8000-123456789ABC"),
                CustomField::new(fields::CERTIFIED_AT, "2026-02-10T11:00:00-06:00"),
            ],
            ..Invoice::default()
        };
        let document = build_cancellation(&invoice, &foreign_contact(), &Emitter::default(), issued_at());
        assert_eq!(document.document_id, "6F1A2B3C-0000-4000-8000-123456789ABC");
        assert_eq!(document.original_issue_date, "2026-02-10T11:00:00-06:00");
        assert_eq!(document.receiver_id, "CF");
        assert_eq!(document.reason, "Anulacion");
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(format_timestamp(&issued_at()), "2026-03-02T09:15:00-06:00");
        assert_eq!(guatemala_now().offset().local_minus_utc(), -GUATEMALA_OFFSET_SECONDS);
    }

    #[test]
    fn final_consumer_limit_boundary() {
        let receiver = Receiver::from_contact(&Contact::default());
        let mut invoice = Invoice {
            currency_code: "GTQ".to_string(),
            total: dec!(2500.00),
            ..Invoice::default()
        };
        assert!(validate_final_consumer_limit(&invoice, &receiver).is_ok());

        invoice.total = dec!(2500.01);
        let error = validate_final_consumer_limit(&invoice, &receiver).expect_err("over the limit");
        assert!(matches!(error, FelError::Policy(_)));

        invoice.currency_code = "USD".to_string();
        assert!(validate_final_consumer_limit(&invoice, &receiver).is_ok());
    }

    #[test]
    fn final_consumer_limit_skipped_for_export() {
        let receiver = Receiver::from_contact(&foreign_contact());
        let invoice = Invoice {
            currency_code: "GTQ".to_string(),
            total: dec!(10000),
            ..Invoice::default()
        };
        assert!(validate_final_consumer_limit(&invoice, &receiver).is_ok());
    }
}
