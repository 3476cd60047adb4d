//! Workflow event stream.
//!
//! The workflow reports progress as events instead of printing.
//! Each event goes to the console and to the run log file.

use std::fmt;

use colored::Colorize;
use fel_tools::fel::{Certification, Diagnostic};
use fel_tools::{print_error, print_warning};

use crate::logger::FileLogger;

/// Diagnostics printed to the console per failure. The log file gets all of them.
const CONSOLE_DIAGNOSTIC_LIMIT: usize = 5;

/// Processing stage of one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fetching,
    Validating,
    Building,
    Submitting,
    PersistingSideEffects,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Fetching => "Fetching invoice and customer",
            Self::Validating => "Validating",
            Self::Building => "Building XML document",
            Self::Submitting => "Submitting to INFILE",
            Self::PersistingSideEffects => "Updating Zoho Books",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Step { invoice: String, step: Step },
    Info { invoice: String, message: String },
    Certified { invoice: String, certification: Certification },
    Canceled { invoice: String, uuid: String },
    Failed { invoice: String, error: String },
    Diagnostic { invoice: String, diagnostic: Diagnostic },
    /// A follow-up action after certification or cancellation succeeded.
    Done { invoice: String, action: String },
    Warning { invoice: String, message: String },
    Debug { message: String },
    Document { invoice: String, xml: String },
    Summary { operation: &'static str, succeeded: usize, failed: usize },
}

/// Destination for workflow events.
pub struct EventLog {
    file: Option<FileLogger>,
    verbose: bool,
    console: bool,
    /// Diagnostics printed for the current failure.
    shown_diagnostics: usize,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new(file: Option<FileLogger>, verbose: bool) -> Self {
        Self {
            file,
            verbose,
            console: true,
            shown_diagnostics: 0,
            events: Vec::new(),
        }
    }

    /// Event log that only records events.
    #[cfg(test)]
    pub const fn silent() -> Self {
        Self {
            file: None,
            verbose: false,
            console: false,
            shown_diagnostics: 0,
            events: Vec::new(),
        }
    }

    pub fn file_logger(&mut self) -> Option<&mut FileLogger> {
        self.file.as_mut()
    }

    /// Events emitted so far.
    #[cfg(test)]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn emit(&mut self, event: Event) {
        if self.console {
            self.print(&event);
        }
        if let Some(file) = self.file.as_mut() {
            write_to_file(file, &event);
        }
        self.events.push(event);
    }

    fn print(&mut self, event: &Event) {
        match event {
            Event::Step { invoice, step } => {
                if *step == Step::Fetching {
                    println!("\n>> {}", invoice.bold());
                }
                println!("   {step}...");
            }
            Event::Info { message, .. } => println!("   {}", message.cyan()),
            Event::Certified { certification, .. } => {
                println!("   {}", "CERTIFIED".green().bold());
                println!("   UUID: {}", certification.uuid);
                println!("   Series: {} | Number: {}", certification.series, certification.number);
                if let Some(url) = &certification.pdf_url {
                    println!("   PDF: {url}");
                }
            }
            Event::Canceled { uuid, .. } => {
                println!("   {}", "CANCELED AT SAT".green().bold());
                println!("   UUID: {uuid}");
            }
            Event::Failed { invoice, error } => {
                self.shown_diagnostics = 0;
                print_error!("{invoice}: {error}");
            }
            Event::Diagnostic { diagnostic, .. } => {
                self.shown_diagnostics += 1;
                if self.shown_diagnostics <= CONSOLE_DIAGNOSTIC_LIMIT {
                    println!("   {}", format!("- {diagnostic}").red());
                } else if self.shown_diagnostics == CONSOLE_DIAGNOSTIC_LIMIT + 1 {
                    println!("   {}", "- more diagnostics in the log file".red());
                }
            }
            Event::Done { action, .. } => println!("   {action}"),
            Event::Warning { message, .. } => print_warning!("   Warning: {message}"),
            Event::Debug { message } => {
                if self.verbose {
                    println!("   {}", format!("[DEBUG] {message}").dimmed());
                }
            }
            Event::Document { xml, .. } => {
                if self.verbose {
                    println!("{}", xml.dimmed());
                }
            }
            Event::Summary { .. } => {}
        }
    }
}

fn write_to_file(file: &mut FileLogger, event: &Event) {
    match event {
        Event::Step { invoice, step } => file.log_line("STEP", &format!("{invoice} {step}")),
        Event::Info { invoice, message } => file.log_line("INFO", &format!("{invoice} {message}")),
        Event::Certified { invoice, certification } => file.log_line(
            "SUCCESS",
            &format!(
                "{invoice} certified | UUID: {} | Series: {} | Number: {} | Date: {}",
                certification.uuid, certification.series, certification.number, certification.certified_at
            ),
        ),
        Event::Canceled { invoice, uuid } => file.log_line("SUCCESS", &format!("{invoice} canceled | UUID: {uuid}")),
        Event::Failed { invoice, error } => file.log_line("ERROR", &format!("{invoice} {error}")),
        Event::Diagnostic { invoice, diagnostic } => file.log_line("DIAG", &format!("{invoice} {diagnostic}")),
        Event::Done { invoice, action } => file.log_line("DONE", &format!("{invoice} {action}")),
        Event::Warning { invoice, message } => file.log_line("WARN", &format!("{invoice} {message}")),
        Event::Debug { message } => file.log_line("DEBUG", message),
        Event::Document { invoice, xml } => file.log_block("XML", invoice, xml),
        Event::Summary {
            operation,
            succeeded,
            failed,
        } => file.log_line(
            "SUMMARY",
            &format!("{operation}: {succeeded} succeeded, {failed} failed"),
        ),
    }
}
