//! Configuration module for budgetexport.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::BudgetExportArgs;

/// Default worksheet holding the budget.
pub const DEFAULT_SHEET: &str = "Presupuesto 2026";

/// Default output file name, relative to the current directory.
pub const DEFAULT_OUTPUT: &str = "datos-presupuesto.js";

/// Default workbook file name inside the downloads directory.
const DEFAULT_WORKBOOK: &str = "Presupuesto 2026.xlsx";

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetExportConfig {
    /// Budget workbook path.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Generated data file path.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Worksheet name.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Keep the current product-sales forecast without asking.
    #[serde(default)]
    pub keep: bool,
    /// Commit and push the output file without asking.
    #[serde(default)]
    pub push: bool,
    /// Print verbose output.
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    budgetexport: BudgetExportConfig,
}

impl BudgetExportConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = fel_tools::config::resolve_config_path(explicit) else {
            return Ok(Self::default());
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow!("Failed to read config file {}: {error}", path.display())),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.budgetexport)
            .map_err(|e| anyhow!("Failed to parse config: {e}"))
    }
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    /// Budget workbook.
    pub input: PathBuf,
    /// Generated data file.
    pub output: PathBuf,
    /// Worksheet name.
    pub sheet: String,
    /// Keep the current product-sales forecast without asking.
    pub keep: bool,
    /// Commit and push without asking.
    pub push: bool,
    /// Print verbose output.
    pub verbose: bool,
}

fn default_input() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_default()
        .join(DEFAULT_WORKBOOK)
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file can't be parsed or the workbook does not exist.
    pub fn from_args(args: &BudgetExportArgs) -> Result<Self> {
        let user_config = BudgetExportConfig::get_user_config(args.config.as_deref())?;
        Self::from_args_and_config(args, user_config)
    }

    /// Create config from given command line args and explicit user config.
    ///
    /// # Errors
    /// Returns an error if the workbook does not exist.
    pub fn from_args_and_config(args: &BudgetExportArgs, user_config: BudgetExportConfig) -> Result<Self> {
        // CLI args take priority over user config
        let input = args.path.clone().or(user_config.input).unwrap_or_else(default_input);
        let input = fel_tools::resolve_existing_file(&input).context("Budget workbook not found")?;

        let output = args
            .output
            .clone()
            .or(user_config.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let sheet = args
            .sheet
            .clone()
            .or(user_config.sheet)
            .unwrap_or_else(|| DEFAULT_SHEET.to_string());

        Ok(Self {
            input,
            output,
            sheet,
            keep: args.keep || user_config.keep,
            push: args.push || user_config.push,
            verbose: args.verbose || user_config.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = BudgetExportConfig::from_toml_str("").expect("should parse empty config");
        assert!(config.input.is_none());
        assert!(config.sheet.is_none());
        assert!(!config.keep);
        assert!(!config.push);
    }

    #[test]
    fn from_toml_str_parses_budgetexport_section() {
        let toml = r#"
[felassist]
identifier_prefix = "ACME"

[budgetexport]
input = "/data/Presupuesto 2027.xlsx"
output = "site/datos-presupuesto.js"
sheet = "Presupuesto 2027"
keep = true
verbose = true
"#;
        let config = BudgetExportConfig::from_toml_str(toml).expect("should parse config");
        assert_eq!(config.input, Some(PathBuf::from("/data/Presupuesto 2027.xlsx")));
        assert_eq!(config.output, Some(PathBuf::from("site/datos-presupuesto.js")));
        assert_eq!(config.sheet.as_deref(), Some("Presupuesto 2027"));
        assert!(config.keep);
        assert!(!config.push);
        assert!(config.verbose);
    }

    #[test]
    fn from_toml_str_wrong_type_returns_error() {
        let toml = "[budgetexport]\nkeep = \"yes\"";
        assert!(BudgetExportConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config =
            BudgetExportConfig::get_user_config(Some(&dir.path().join("missing.toml"))).expect("defaults");
        assert!(config.output.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn args_take_priority() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workbook = dir.path().join("budget.xlsx");
        fs::write(&workbook, b"placeholder").expect("write");

        let args = BudgetExportArgs::parse_from([
            "budgetexport",
            workbook.to_str().expect("utf-8 path"),
            "--sheet",
            "Hoja 1",
            "--push",
        ]);
        let user_config = BudgetExportConfig {
            sheet: Some("Presupuesto 2026".to_string()),
            output: Some(PathBuf::from("out.js")),
            keep: true,
            ..BudgetExportConfig::default()
        };
        let config = Config::from_args_and_config(&args, user_config).expect("valid config");
        assert_eq!(config.sheet, "Hoja 1");
        assert_eq!(config.output, PathBuf::from("out.js"));
        assert!(config.keep);
        assert!(config.push);
        assert!(config.input.ends_with("budget.xlsx"));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.xlsx");
        let args = BudgetExportArgs::parse_from(["budgetexport", missing.to_str().expect("utf-8 path")]);
        assert!(Config::from_args_and_config(&args, BudgetExportConfig::default()).is_err());
    }
}
