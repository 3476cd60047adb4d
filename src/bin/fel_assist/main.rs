mod books;
mod config;
mod events;
mod infile;
mod logger;
mod menu;
mod workflow;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use fel_tools::print_warning;

use crate::books::ZohoBooksClient;
use crate::config::{Config, FelAssistConfig, InfileConfig};
use crate::events::EventLog;
use crate::infile::InfileClient;
use crate::logger::FileLogger;
use crate::workflow::{Workflow, WorkflowSettings};

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Certify and cancel Zoho Books invoices as Guatemalan FEL documents through INFILE"
)]
pub(crate) struct FelAssistArgs {
    /// Config file to use instead of the default user config
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Prefix for certification identifiers
    #[arg(short, long, name = "PREFIX")]
    prefix: Option<String>,

    /// Print debug information and generated XML documents
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = FelAssistArgs::parse();
    if let Some(ref shell) = args.completion {
        fel_tools::generate_shell_completion(*shell, FelAssistArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        run(args).await
    }
}

fn print_environment_banner(infile: &InfileConfig) {
    let banner = format!("*** ENVIRONMENT: {} ***", infile.environment.trim().to_uppercase());
    if infile.is_test_environment() {
        println!("\n{}", banner.yellow().bold());
        println!("{}", "*** Invoices will NOT have fiscal validity ***".yellow());
    } else {
        println!("\n{}", banner.green().bold());
    }
}

fn open_log_file(config: &Config) -> Option<FileLogger> {
    match FileLogger::new() {
        Ok(mut logger) => {
            logger.log_init(config);
            if config.verbose {
                println!("Log file: {}", logger.path().display());
            }
            Some(logger)
        }
        Err(error) => {
            print_warning!("Failed to create log file: {error}");
            None
        }
    }
}

async fn run(args: FelAssistArgs) -> Result<()> {
    println!("Loading configuration...");
    let user_config = FelAssistConfig::load(args.config.as_deref())?;
    let config = Config::from_args_and_config(&args, user_config)?;

    print_environment_banner(&config.infile);
    let log_file = open_log_file(&config);

    println!("\nConnecting to Zoho Books...");
    let mut books = ZohoBooksClient::new(config.books.clone())?;
    books.authenticate().await.context("Failed to connect to Zoho Books")?;
    println!("{}", "Connected".green());

    let certifier = InfileClient::new(config.infile.clone())?;
    let settings = WorkflowSettings {
        emitter: config.emitter.clone(),
        phrases: config.phrases.clone(),
        identifier_prefix: config.identifier_prefix.clone(),
        email_signature: config.email_signature.clone(),
    };
    let mut workflow = Workflow::new(books, certifier, settings, EventLog::new(log_file, config.verbose));

    let result = menu::run(&mut workflow).await;
    if let Some(file) = workflow.log().file_logger() {
        file.log_end();
    }
    result
}
