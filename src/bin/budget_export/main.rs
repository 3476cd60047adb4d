//! budgetexport - Export the budget workbook to the data file of the budget viewer page.

mod budget;
mod config;
mod forecast;
mod output;
mod publish;
mod sheet;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use fel_tools::print_error;

use crate::budget::BudgetData;
use crate::config::Config;

/// Command line arguments for budgetexport.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Export budget workbook data to a JavaScript data file"
)]
pub struct BudgetExportArgs {
    /// Budget workbook path
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: Option<PathBuf>,

    /// Output data file path
    #[arg(short, long, name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Worksheet name
    #[arg(short, long)]
    pub sheet: Option<String>,

    /// Keep the current product sales forecast without asking
    #[arg(short, long)]
    pub keep: bool,

    /// Commit and push the output file to the origin remote
    #[arg(short, long)]
    pub push: bool,

    /// Config file to use instead of the default user config
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    pub completion: Option<Shell>,
}

fn main() -> Result<()> {
    let args = BudgetExportArgs::parse();
    if let Some(ref shell) = args.completion {
        fel_tools::generate_shell_completion(*shell, BudgetExportArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        let config = Config::from_args(&args)?;
        budget_export(&config)
    }
}

fn print_publish_hint(config: &Config) {
    println!("\n{}", "-".repeat(50));
    println!("To publish the changes, run:");
    println!("  git add {}", config.output.display());
    println!("  git commit -m \"{}\"", publish::COMMIT_MESSAGE);
    println!("  git push");
    println!("{}", "-".repeat(50));
}

/// Extract the budget, update the forecast, write the data file and optionally publish it.
fn budget_export(config: &Config) -> Result<()> {
    println!("{}", "=".repeat(50));
    println!("{}", format!("BUDGET DATA EXPORT - {}", config.sheet.to_uppercase()).bold());
    println!("{}", "=".repeat(50));

    println!("\nReading: {}", config.input.display());
    let sheet = sheet::open_sheet(&config.input, &config.sheet)?;
    let data = BudgetData::from_sheet(&sheet);

    println!("Extracted:");
    println!("  - {} clients", data.revenue.clients.len());
    println!("  - {} direct costs", data.direct_costs.detail.len());
    println!("  - {} consultants", data.opex.consultants.len());
    println!("  - {} software/services", data.opex.software.len());
    println!("  - {} other expenses", data.opex.other.len());

    let current_sales = forecast::load_product_sales(&config.output);
    let sales = if config.keep {
        if config.verbose {
            let total: f64 = current_sales.iter().sum();
            println!("Keeping current product sales: Q {}", fel_tools::format_amount(total));
        }
        current_sales
    } else {
        forecast::prompt_product_sales(&current_sales)?
    };
    let data = data.with_product_sales(sales);

    let updated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let content = output::render(&data, &config.sheet, &updated_at)?;
    println!("\nSaving: {}", config.output.display());
    output::write_output(&config.output, &content)?;
    output::print_summary(&data);

    let push = config.push || (!config.keep && fel_tools::confirm_with_user("\nPush changes to GitHub now?", false)?);
    if push {
        println!("\nPublishing...");
        match publish::publish(&config.output, config.verbose) {
            Ok(()) => println!("{}", "Changes published".green()),
            Err(error) => {
                print_error!("Failed to publish: {error:#}");
                print_publish_hint(config);
            }
        }
    } else {
        print_publish_hint(config);
    }
    Ok(())
}
