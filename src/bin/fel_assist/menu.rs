//! Interactive console menu.

use anyhow::Result;
use colored::Colorize;
use fel_tools::fel::InvoiceSummary;
use fel_tools::{format_amount, parse_selection, print_divider, print_warning, read_input, truncate_chars};

use crate::books::Ledger;
use crate::infile::Certifier;
use crate::workflow::{BatchReport, Cancellable, Workflow};

const WIDTH: usize = 70;
const CUSTOMER_WIDTH: usize = 28;
const UUID_PREVIEW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Certify,
    Cancel,
    Exit,
}

impl MenuChoice {
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Certify),
            "2" => Some(Self::Cancel),
            "0" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Cancellation needs an explicit typed confirmation.
#[must_use]
pub fn is_cancellation_confirmed(input: &str) -> bool {
    matches!(input.trim(), "SI" | "YES")
}

/// UUID shortened for the table.
#[must_use]
pub fn short_uuid(uuid: &str) -> String {
    if uuid.chars().count() > UUID_PREVIEW {
        format!("{}...", truncate_chars(uuid, UUID_PREVIEW))
    } else {
        uuid.to_string()
    }
}

fn total_column(summary: &InvoiceSummary) -> String {
    format!("{} {:>12}", summary.currency_code, format_amount(summary.total))
}

/// One row of the draft invoice table.
#[must_use]
pub fn invoice_row(index: usize, summary: &InvoiceSummary) -> String {
    format!(
        "{:<4} {:<15} {:<30} {}",
        index + 1,
        summary.invoice_number,
        truncate_chars(&summary.customer_name, CUSTOMER_WIDTH),
        total_column(summary)
    )
}

/// One row of the cancellable invoice table.
#[must_use]
pub fn cancellable_row(index: usize, candidate: &Cancellable) -> String {
    format!(
        "{:<4} {:<15} {:<30} {:<16} {}",
        index + 1,
        truncate_chars(&candidate.summary.invoice_number, 15),
        truncate_chars(&candidate.summary.customer_name, CUSTOMER_WIDTH),
        short_uuid(&candidate.uuid),
        total_column(&candidate.summary)
    )
}

fn print_header(title: &str) {
    println!("{}", "=".repeat(WIDTH));
    println!("{}", format!("{title:^WIDTH$}").bold());
    println!("{}", "=".repeat(WIDTH));
}

fn print_selection_help() {
    print_divider(WIDTH);
    println!("Options:");
    println!("  - Enter numbers separated by commas (e.g. 1,3,5)");
    println!("  - Enter 'T' to select all");
    println!("  - Enter '0' to go back");
    print_divider(WIDTH);
}

/// Ask for a selection. Invalid input selects nothing.
fn select(prompt: &str, count: usize) -> Result<Vec<usize>> {
    let input = read_input(prompt)?;
    match parse_selection(&input, count) {
        Ok(indices) => Ok(indices),
        Err(error) => {
            print_warning!("{error}");
            Ok(Vec::new())
        }
    }
}

fn print_report(report: &BatchReport, verb: &str) {
    println!();
    print_header("SUMMARY");
    println!("{}", format!("Succeeded: {}", report.succeeded.len()).green());
    for item in &report.succeeded {
        println!("  - {} {verb} (UUID: {})", item.invoice_number, item.uuid);
    }
    if !report.failed.is_empty() {
        println!("{}", format!("Failed: {}", report.failed.len()).red());
        for item in &report.failed {
            println!("  - {}: {}", item.invoice_number, item.error);
        }
    }
    print_divider(WIDTH);
}

/// Run the main menu until the user exits.
///
/// # Errors
/// Returns an error if reading from stdin fails.
pub async fn run<L: Ledger, C: Certifier>(workflow: &mut Workflow<L, C>) -> Result<()> {
    loop {
        println!();
        print_header("FEL INVOICE ASSISTANT");
        println!("\n  1) Certify invoices (draft -> FEL)");
        println!("  2) Cancel invoices (certified -> SAT cancellation)");
        println!("  0) Exit");
        print_divider(WIDTH);

        let input = read_input("\nSelect an option: ")?;
        match MenuChoice::parse(&input) {
            Some(MenuChoice::Certify) => certification_flow(workflow).await?,
            Some(MenuChoice::Cancel) => cancellation_flow(workflow).await?,
            Some(MenuChoice::Exit) => {
                println!("\nExiting...");
                return Ok(());
            }
            None => print_warning!("Invalid option, try again."),
        }
    }
}

async fn certification_flow<L: Ledger, C: Certifier>(workflow: &mut Workflow<L, C>) -> Result<()> {
    println!("\nFetching draft invoices...");
    let drafts = match workflow.draft_invoices().await {
        Ok(drafts) => drafts,
        Err(error) => {
            fel_tools::print_error!("Failed to list draft invoices: {error}");
            return Ok(());
        }
    };
    if drafts.is_empty() {
        println!("\nNo draft invoices to process.");
        return Ok(());
    }

    println!("\nDraft invoices found: {}\n", drafts.len());
    print_divider(WIDTH);
    println!("{:<4} {:<15} {:<30} {}", "#", "Number", "Customer", "Total");
    print_divider(WIDTH);
    for (index, summary) in drafts.iter().enumerate() {
        println!("{}", invoice_row(index, summary));
    }
    print_selection_help();

    let indices = select("\nSelect invoices to certify: ", drafts.len())?;
    if indices.is_empty() {
        return Ok(());
    }
    let selected: Vec<InvoiceSummary> = indices.into_iter().map(|index| drafts[index].clone()).collect();

    println!("\nCertifying {} invoice(s)...", selected.len());
    let report = workflow.certify_batch(&selected).await;
    print_report(&report, "certified");
    Ok(())
}

async fn cancellation_flow<L: Ledger, C: Certifier>(workflow: &mut Workflow<L, C>) -> Result<()> {
    println!("\nFetching certified invoices...");
    let candidates = match workflow.cancellable_invoices().await {
        Ok(candidates) => candidates,
        Err(error) => {
            fel_tools::print_error!("Failed to list certified invoices: {error}");
            return Ok(());
        }
    };
    if candidates.is_empty() {
        println!("\nNo certified invoices available for cancellation.");
        return Ok(());
    }

    println!("\nCertified invoices found: {}\n", candidates.len());
    print_divider(WIDTH);
    println!("{:<4} {:<15} {:<30} {:<16} {}", "#", "Number", "Customer", "UUID", "Total");
    print_divider(WIDTH);
    for (index, candidate) in candidates.iter().enumerate() {
        println!("{}", cancellable_row(index, candidate));
    }
    print_selection_help();

    let indices = select("\nSelect invoices to cancel: ", candidates.len())?;
    if indices.is_empty() {
        return Ok(());
    }

    println!(
        "\n{}",
        format!("*** WARNING: {} invoice(s) will be canceled at SAT ***", indices.len())
            .red()
            .bold()
    );
    let answer = read_input("Type 'SI' to confirm: ")?;
    if !is_cancellation_confirmed(&answer) {
        println!("Cancellation aborted.");
        return Ok(());
    }

    let selected: Vec<Cancellable> = indices.into_iter().map(|index| candidates[index].clone()).collect();
    println!("\nCanceling {} invoice(s)...", selected.len());
    let report = workflow.cancel_batch(&selected).await;
    print_report(&report, "canceled");
    Ok(())
}
