//! Certification and cancellation workflows.
//!
//! Each invoice goes through fetch, validation, document building and submission.
//! Ledger updates after a successful submission are best effort: failures are
//! reported as warnings and never undo what the authority already accepted.

use chrono::{DateTime, FixedOffset};
use fel_tools::fel::{
    Certification, Contact, CustomField, Emitter, FelError, FiscalDocument, Invoice, InvoiceSummary, Phrase,
    Receiver, STATUS_CANCELED, STATUS_CERTIFIED, build_cancellation, build_certification, builder, fields,
    receiver, validate_final_consumer_limit,
};
use itertools::Itertools;

use crate::books::{EmailMessage, InvoiceStatus, InvoiceUpdate, Ledger};
use crate::events::{Event, EventLog, Step};
use crate::infile::Certifier;

/// Token prefix for cancellation submissions.
const CANCELLATION_PREFIX: &str = "ANULA";

const CANCELLATION_UPDATE_REASON: &str = "Anulacion FEL en SAT";

/// Emitter data and text used by the workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub emitter: Emitter,
    pub phrases: Vec<Phrase>,
    pub identifier_prefix: String,
    pub email_signature: String,
}

/// Successfully processed invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succeeded {
    pub invoice_number: String,
    pub uuid: String,
}

/// Failed invoice with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub invoice_number: String,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<Succeeded>,
    pub failed: Vec<Failed>,
}

impl BatchReport {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Certified invoice that can be canceled, with its fetched detail.
#[derive(Debug, Clone, PartialEq)]
pub struct Cancellable {
    pub summary: InvoiceSummary,
    pub invoice: Invoice,
    pub uuid: String,
}

/// Sent invoice with a persisted UUID and the certified status.
#[must_use]
pub fn is_cancellable(invoice: &Invoice) -> bool {
    invoice.is_sent()
        && invoice.custom_field(fields::UUID).is_some()
        && invoice.custom_field(fields::STATUS).as_deref() == Some(STATUS_CERTIFIED)
}

/// Idempotency token: `{prefix}_{invoice number}_{YYYYmmddHHMMSS}`.
#[must_use]
pub fn document_identifier(prefix: &str, invoice_number: &str, at: &DateTime<FixedOffset>) -> String {
    format!("{prefix}_{invoice_number}_{}", at.format("%Y%m%d%H%M%S"))
}

/// Ledger update recording a certification.
#[must_use]
pub fn certification_update(certification: &Certification, today: &str) -> InvoiceUpdate {
    let mut custom_fields = vec![
        CustomField::new(fields::UUID, &certification.uuid),
        CustomField::new(fields::SERIES, &certification.series),
        CustomField::new(fields::NUMBER, &certification.number),
        CustomField::new(fields::CERTIFIED_AT, &certification.certified_at),
        CustomField::new(fields::STATUS, STATUS_CERTIFIED),
    ];
    if let Some(url) = &certification.pdf_url {
        custom_fields.push(CustomField::new(fields::PDF_URL, url));
    }
    if let Some(url) = &certification.xml_url {
        custom_fields.push(CustomField::new(fields::XML_URL, url));
    }

    InvoiceUpdate {
        reason: format!("Certificacion FEL - UUID: {}", certification.uuid),
        invoice_number: certification.invoice_number(),
        date: Some(certification.certified_date().unwrap_or(today).to_string()),
        notes: Some(format!("NÚMERO DE AUTORIZACIÓN: {}", certification.uuid)),
        custom_fields,
    }
}

/// Ledger update recording a cancellation.
#[must_use]
pub fn cancellation_update() -> InvoiceUpdate {
    InvoiceUpdate {
        reason: CANCELLATION_UPDATE_REASON.to_string(),
        custom_fields: vec![CustomField::new(fields::STATUS, STATUS_CANCELED)],
        ..InvoiceUpdate::default()
    }
}

/// Email addresses from the contact's email field.
fn recipients(email: &str) -> Vec<String> {
    email
        .split([',', ';'])
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .unique()
        .map(ToString::to_string)
        .collect()
}

/// Customer email announcing the certified invoice.
#[must_use]
pub fn certification_email(
    contact: &Contact,
    certification: &Certification,
    settings: &WorkflowSettings,
) -> EmailMessage {
    let sender = if settings.emitter.commercial_name.trim().is_empty() {
        settings.emitter.name.trim()
    } else {
        settings.emitter.commercial_name.trim()
    };
    let subject = format!(
        "Factura Electrónica {}-{} - {sender}",
        certification.series, certification.number
    );

    let body = [
        "Estimado cliente,".to_string(),
        String::new(),
        "Adjunto encontrará su Factura Electrónica certificada.".to_string(),
        String::new(),
        "DATOS DEL CLIENTE:".to_string(),
        format!("- Nombre: {}", contact.contact_name.trim()),
        format!("- Razón Social: {}", receiver::resolve_business_name(contact)),
        String::new(),
        "DATOS DE CERTIFICACIÓN FEL:".to_string(),
        format!("- Serie: {}", certification.series),
        format!("- Número DTE: {}", certification.number),
        format!("- No. Autorización (UUID): {}", certification.uuid),
        format!("- Fecha de Certificación: {}", certification.certified_at),
        String::new(),
        "VER/DESCARGAR FACTURA CERTIFICADA:".to_string(),
        certification.pdf_url.clone().unwrap_or_default(),
        String::new(),
        "Este documento tiene validez tributaria ante SAT.".to_string(),
        String::new(),
        "Atentamente,".to_string(),
        settings.email_signature.trim().to_string(),
    ]
    .join("\n");

    EmailMessage {
        to_mail_ids: recipients(&contact.email),
        subject,
        body,
    }
}

/// Runs certification and cancellation batches against a ledger and an authority.
pub struct Workflow<L, C> {
    ledger: L,
    certifier: C,
    settings: WorkflowSettings,
    log: EventLog,
    clock: fn() -> DateTime<FixedOffset>,
}

impl<L: Ledger, C: Certifier> Workflow<L, C> {
    pub fn new(ledger: L, certifier: C, settings: WorkflowSettings, log: EventLog) -> Self {
        Self {
            ledger,
            certifier,
            settings,
            log,
            clock: builder::guatemala_now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<FixedOffset>) -> Self {
        self.clock = clock;
        self
    }

    pub fn log(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Draft invoices waiting for certification.
    ///
    /// # Errors
    /// Returns an error if the ledger request fails.
    pub async fn draft_invoices(&self) -> Result<Vec<InvoiceSummary>, FelError> {
        self.ledger.list_invoices("draft").await
    }

    /// Sent invoices with a certified status, detail fetched per invoice.
    ///
    /// # Errors
    /// Returns an error if listing fails. Invoices whose detail can't be fetched are skipped.
    pub async fn cancellable_invoices(&mut self) -> Result<Vec<Cancellable>, FelError> {
        let summaries = self.ledger.list_invoices("sent").await?;
        let mut candidates = Vec::new();
        for summary in summaries {
            match self.ledger.invoice(&summary.invoice_id).await {
                Ok(invoice) => {
                    if is_cancellable(&invoice) {
                        let uuid = invoice.custom_field(fields::UUID).unwrap_or_default();
                        candidates.push(Cancellable { summary, invoice, uuid });
                    }
                }
                Err(error) => self.log.emit(Event::Warning {
                    invoice: summary.invoice_number.clone(),
                    message: format!("Could not fetch invoice detail: {error}"),
                }),
            }
        }
        Ok(candidates)
    }

    /// Certify the given invoices one by one.
    pub async fn certify_batch(&mut self, invoices: &[InvoiceSummary]) -> BatchReport {
        let mut report = BatchReport::default();
        for summary in invoices {
            match self.certify(summary).await {
                Ok(certification) => report.succeeded.push(Succeeded {
                    invoice_number: summary.invoice_number.clone(),
                    uuid: certification.uuid,
                }),
                Err(error) => self.record_failure(&mut report, &summary.invoice_number, error),
            }
        }
        self.log.emit(Event::Summary {
            operation: "certification",
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });
        report
    }

    /// Cancel the given certified invoices one by one.
    pub async fn cancel_batch(&mut self, candidates: &[Cancellable]) -> BatchReport {
        let mut report = BatchReport::default();
        for candidate in candidates {
            match self.cancel(candidate).await {
                Ok(()) => report.succeeded.push(Succeeded {
                    invoice_number: candidate.summary.invoice_number.clone(),
                    uuid: candidate.uuid.clone(),
                }),
                Err(error) => self.record_failure(&mut report, &candidate.summary.invoice_number, error),
            }
        }
        self.log.emit(Event::Summary {
            operation: "cancellation",
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });
        report
    }

    fn record_failure(&mut self, report: &mut BatchReport, invoice_number: &str, error: FelError) {
        let message = match error {
            FelError::Rejected {
                description,
                diagnostics,
            } => {
                self.log.emit(Event::Failed {
                    invoice: invoice_number.to_string(),
                    error: description.clone(),
                });
                for diagnostic in diagnostics {
                    self.log.emit(Event::Diagnostic {
                        invoice: invoice_number.to_string(),
                        diagnostic,
                    });
                }
                description
            }
            other => {
                let message = other.to_string();
                self.log.emit(Event::Failed {
                    invoice: invoice_number.to_string(),
                    error: message.clone(),
                });
                message
            }
        };
        report.failed.push(Failed {
            invoice_number: invoice_number.to_string(),
            error: message,
        });
    }

    fn step(&mut self, invoice: &str, step: Step) {
        self.log.emit(Event::Step {
            invoice: invoice.to_string(),
            step,
        });
    }

    fn warn(&mut self, invoice: &str, message: String) {
        self.log.emit(Event::Warning {
            invoice: invoice.to_string(),
            message,
        });
    }

    fn done(&mut self, invoice: &str, action: String) {
        self.log.emit(Event::Done {
            invoice: invoice.to_string(),
            action,
        });
    }

    async fn certify(&mut self, summary: &InvoiceSummary) -> Result<Certification, FelError> {
        let number = summary.invoice_number.as_str();

        self.step(number, Step::Fetching);
        let invoice = self.ledger.invoice(&summary.invoice_id).await?;
        // No fallback to an empty final-consumer contact: an unreadable customer fails the invoice.
        let contact = self.ledger.contact(&invoice.customer_id).await?;

        self.step(number, Step::Validating);
        let receiver = Receiver::from_contact(&contact);
        if receiver.jurisdiction.is_export() {
            self.log.emit(Event::Info {
                invoice: number.to_string(),
                message: format!(
                    "Export invoice detected (country: {})",
                    contact.billing_address.country.trim()
                ),
            });
        }
        validate_final_consumer_limit(&invoice, &receiver)?;

        self.step(number, Step::Building);
        let issued_at = (self.clock)();
        let document = build_certification(
            &invoice,
            &contact,
            &self.settings.emitter,
            &self.settings.phrases,
            issued_at,
        )?;
        let xml = FiscalDocument::from(document).to_xml()?;
        self.log.emit(Event::Document {
            invoice: number.to_string(),
            xml: xml.clone(),
        });

        self.step(number, Step::Submitting);
        let identifier = document_identifier(&self.settings.identifier_prefix, number, &issued_at);
        self.log.emit(Event::Debug {
            message: format!("Identifier: {identifier}"),
        });
        let certification = self.certifier.submit(&xml, &identifier).await?.into_result()?;
        self.log.emit(Event::Certified {
            invoice: number.to_string(),
            certification: certification.clone(),
        });

        self.step(number, Step::PersistingSideEffects);
        self.persist_certification(number, &invoice, &contact, &certification)
            .await;

        Ok(certification)
    }

    async fn persist_certification(
        &mut self,
        number: &str,
        invoice: &Invoice,
        contact: &Contact,
        certification: &Certification,
    ) {
        let invoice_id = invoice.invoice_id.as_str();

        if !invoice.is_sent() {
            match self.ledger.mark_status(invoice_id, InvoiceStatus::Sent).await {
                Ok(()) => self.done(number, "Invoice marked as sent".to_string()),
                Err(error) => self.warn(number, format!("Could not mark invoice as sent: {error}")),
            }
        }

        let today = (self.clock)().format("%Y-%m-%d").to_string();
        let update = certification_update(certification, &today);
        match self.ledger.update_invoice(invoice_id, &update).await {
            Ok(()) => self.done(
                number,
                format!(
                    "Invoice updated: {}",
                    update.invoice_number.as_deref().unwrap_or(number)
                ),
            ),
            Err(error) => self.warn(
                number,
                format!("Could not update invoice in Zoho Books, but it IS certified at SAT: {error}"),
            ),
        }

        if let Some(url) = &certification.pdf_url {
            match self.attach_pdf(invoice_id, url, &certification.pdf_file_name()).await {
                Ok(()) => self.done(number, format!("PDF attached: {}", certification.pdf_file_name())),
                Err(error) => self.warn(number, format!("Could not attach PDF: {error}")),
            }
        }

        let message = certification_email(contact, certification, &self.settings);
        if message.to_mail_ids.is_empty() {
            self.warn(number, "Customer has no email configured".to_string());
        } else {
            match self.ledger.email_invoice(invoice_id, &message).await {
                Ok(()) => self.done(number, format!("Email sent to: {}", message.to_mail_ids.join(", "))),
                Err(error) => self.warn(number, format!("Could not send email: {error}")),
            }
        }
    }

    /// Download the authority PDF into a scoped temporary directory and upload it.
    async fn attach_pdf(&mut self, invoice_id: &str, url: &str, file_name: &str) -> Result<(), FelError> {
        let download = self.certifier.download(url).await?;
        if !download.is_pdf() {
            return Err(FelError::Parse(format!(
                "Response is not a PDF (Content-Type: {})",
                download.content_type
            )));
        }

        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        tokio::fs::write(&path, &download.bytes).await?;
        let result = self.ledger.attach_file(invoice_id, &path).await;
        if let Err(error) = dir.close() {
            self.log.emit(Event::Debug {
                message: format!("Failed to remove temporary PDF: {error}"),
            });
        }
        result
    }

    async fn cancel(&mut self, candidate: &Cancellable) -> Result<(), FelError> {
        let number = candidate.summary.invoice_number.as_str();
        let invoice = &candidate.invoice;

        self.step(number, Step::Fetching);
        let contact = self.ledger.contact(&invoice.customer_id).await?;

        self.step(number, Step::Building);
        let canceled_at = (self.clock)();
        let document = build_cancellation(invoice, &contact, &self.settings.emitter, canceled_at);
        let xml = FiscalDocument::from(document).to_xml()?;
        self.log.emit(Event::Document {
            invoice: number.to_string(),
            xml: xml.clone(),
        });

        self.step(number, Step::Submitting);
        let identifier = document_identifier(CANCELLATION_PREFIX, number, &canceled_at);
        self.log.emit(Event::Debug {
            message: format!("Identifier: {identifier}"),
        });
        self.certifier.submit(&xml, &identifier).await?.into_result()?;
        self.log.emit(Event::Canceled {
            invoice: number.to_string(),
            uuid: candidate.uuid.clone(),
        });

        self.step(number, Step::PersistingSideEffects);
        if let Err(error) = self.ledger.mark_status(&invoice.invoice_id, InvoiceStatus::Void).await {
            self.warn(
                number,
                format!("Could not void invoice in Zoho Books, but it IS canceled at SAT: {error}"),
            );
            return Ok(());
        }
        self.done(number, "Invoice marked as void".to_string());

        match self.ledger.update_invoice(&invoice.invoice_id, &cancellation_update()).await {
            Ok(()) => self.done(number, format!("{} set to {STATUS_CANCELED}", fields::STATUS)),
            Err(error) => self.warn(
                number,
                format!("Invoice is void but {} could not be updated: {error}", fields::STATUS),
            ),
        }
        Ok(())
    }
}
