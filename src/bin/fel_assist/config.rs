//! Configuration for felassist.
//!
//! Credentials and the emitter identity live in the `[felassist]` section of the user config file.
//! Unlike the other tools there are no usable defaults, so a missing file or key ends the run.

use std::path::Path;

use anyhow::{Result, bail};
use fel_tools::fel::{Emitter, Phrase};
use serde::Deserialize;

use crate::FelAssistArgs;

const DEFAULT_REPORT_URL: &str = "https://report.feel.com.gt/ingfacereport/ingfacereport_documento";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";
const DEFAULT_API_DOMAIN: &str = "https://www.zohoapis.com";
const DEFAULT_IDENTIFIER_PREFIX: &str = "FEL";
const TEST_ENVIRONMENTS: &[&str] = &["PRUEBAS", "TEST", "SANDBOX"];

/// Certification authority settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfileConfig {
    /// `PRUEBAS` for the test environment, `PRODUCCION` otherwise.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub certification_url: String,
    /// Base URL of the document report, queried with `?uuid=`.
    #[serde(default = "default_report_url")]
    pub report_url: String,
    #[serde(default)]
    pub signing_user: String,
    #[serde(default)]
    pub signing_key: String,
    #[serde(default)]
    pub api_user: String,
    #[serde(default)]
    pub api_key: String,
}

impl InfileConfig {
    #[must_use]
    pub fn is_test_environment(&self) -> bool {
        TEST_ENVIRONMENTS.contains(&self.environment.trim().to_uppercase().as_str())
    }
}

/// Zoho Books OAuth credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BooksConfig {
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_domain")]
    pub api_domain: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// User configuration from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FelAssistConfig {
    #[serde(default)]
    pub infile: InfileConfig,
    #[serde(default)]
    pub books: BooksConfig,
    #[serde(default)]
    pub emitter: Emitter,
    /// Legal phrases for domestic documents.
    #[serde(default)]
    pub phrases: Vec<Phrase>,
    /// Prefix of the certification idempotency token.
    #[serde(default)]
    pub identifier_prefix: Option<String>,
    /// Closing lines of the customer email. Defaults to the emitter names.
    #[serde(default)]
    pub email_signature: Option<String>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    felassist: Option<FelAssistConfig>,
}

fn default_environment() -> String {
    "PRUEBAS".to_string()
}

fn default_report_url() -> String {
    DEFAULT_REPORT_URL.to_string()
}

fn default_accounts_url() -> String {
    DEFAULT_ACCOUNTS_URL.to_string()
}

fn default_api_domain() -> String {
    DEFAULT_API_DOMAIN.to_string()
}

impl FelAssistConfig {
    /// Read the user config from the given path or the default config file.
    ///
    /// # Errors
    /// Returns an error if the file is missing, can't be parsed, or has no `[felassist]` section.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = fel_tools::config::read_config_file(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid or the section is missing.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<UserConfig>(toml_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))?;
        match config.felassist {
            Some(section) => Ok(section),
            None => bail!("Config file has no [felassist] section"),
        }
    }

    /// Names of required keys that are missing or empty.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let required = [
            ("infile.certification_url", &self.infile.certification_url),
            ("infile.signing_user", &self.infile.signing_user),
            ("infile.signing_key", &self.infile.signing_key),
            ("infile.api_user", &self.infile.api_user),
            ("infile.api_key", &self.infile.api_key),
            ("books.organization_id", &self.books.organization_id),
            ("books.client_id", &self.books.client_id),
            ("books.client_secret", &self.books.client_secret),
            ("books.refresh_token", &self.books.refresh_token),
            ("emitter.tax_id", &self.emitter.tax_id),
            ("emitter.name", &self.emitter.name),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| key)
            .collect()
    }
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub infile: InfileConfig,
    pub books: BooksConfig,
    pub emitter: Emitter,
    pub phrases: Vec<Phrase>,
    pub identifier_prefix: String,
    pub email_signature: String,
    pub verbose: bool,
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if required keys are missing.
    pub fn from_args_and_config(args: &FelAssistArgs, user_config: FelAssistConfig) -> Result<Self> {
        let missing = user_config.missing_keys();
        if !missing.is_empty() {
            bail!("Missing required config values in [felassist]: {}", missing.join(", "));
        }

        let identifier_prefix = args
            .prefix
            .clone()
            .or(user_config.identifier_prefix)
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTIFIER_PREFIX.to_string());

        let email_signature = user_config
            .email_signature
            .filter(|signature| !signature.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{}\n{}",
                    user_config.emitter.commercial_name.trim(),
                    user_config.emitter.name.trim()
                )
            });

        Ok(Self {
            infile: user_config.infile,
            books: user_config.books,
            emitter: user_config.emitter,
            phrases: user_config.phrases,
            identifier_prefix,
            email_signature,
            verbose: args.verbose || user_config.verbose,
        })
    }
}
