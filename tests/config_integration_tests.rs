//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the library config types parse the sample config file correctly.

use std::fs;
use std::path::Path;

use fel_tools::fel::{Emitter, Phrase};

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

fn sample_config() -> toml::Value {
    toml::from_str(&read_sample_config()).expect("should parse")
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn sample_config_has_all_sections() {
    let value = sample_config();
    let table = value.as_table().expect("should be a table");

    for section in ["felassist", "budgetexport"] {
        assert!(table.contains_key(section), "Config should have [{section}] section");
    }
}

#[test]
fn felassist_section_has_expected_structure() {
    let value = sample_config();
    let felassist = value.get("felassist").expect("should have felassist section");

    for table in ["infile", "books", "emitter"] {
        assert!(felassist.get(table).is_some(), "Missing [felassist.{table}]");
    }

    let infile = felassist.get("infile").expect("infile");
    for key in [
        "environment",
        "certification_url",
        "signing_user",
        "signing_key",
        "api_user",
        "api_key",
    ] {
        assert!(infile.get(key).is_some(), "Missing infile.{key}");
    }

    let books = felassist.get("books").expect("books");
    for key in ["organization_id", "client_id", "client_secret", "refresh_token"] {
        assert!(books.get(key).is_some(), "Missing books.{key}");
    }
}

#[test]
fn emitter_parses_into_library_type() {
    let value = sample_config();
    let emitter: Emitter = value
        .get("felassist")
        .and_then(|section| section.get("emitter"))
        .cloned()
        .expect("emitter table")
        .try_into()
        .expect("valid emitter");

    assert_eq!(emitter.tax_id, "12345678");
    assert_eq!(emitter.commercial_name, "ACME Digital");
    assert_eq!(emitter.vat_affiliation, "GEN");
    assert_eq!(emitter.address.postal_code, "01010");
    assert_eq!(emitter.address.country, "GT");
}

#[test]
fn emitter_defaults_fill_missing_keys() {
    let emitter: Emitter = toml::from_str("tax_id = \"1\"\nname = \"Emisor\"").expect("valid emitter");
    assert_eq!(emitter.vat_affiliation, "GEN");
    assert_eq!(emitter.establishment_code, "1");
    assert_eq!(emitter.address.city, "Guatemala");
}

#[test]
fn phrases_parse_in_order() {
    let value = sample_config();
    let phrases: Vec<Phrase> = value
        .get("felassist")
        .and_then(|section| section.get("phrases"))
        .cloned()
        .expect("phrases array")
        .try_into()
        .expect("valid phrases");

    assert_eq!(phrases, vec![Phrase::new("1", "1"), Phrase::new("2", "1")]);
}

#[test]
fn budgetexport_section_has_expected_structure() {
    let value = sample_config();
    let budget = value.get("budgetexport").expect("should have budgetexport section");

    assert_eq!(budget.get("sheet").and_then(toml::Value::as_str), Some("Presupuesto 2026"));
    assert_eq!(budget.get("keep").and_then(toml::Value::as_bool), Some(false));
    assert!(budget.get("output").is_some());
    assert!(budget.get("input").is_some());
}

#[test]
fn default_config_path_uses_package_name() {
    if let Some(path) = fel_tools::config::CONFIG_PATH.as_deref() {
        assert!(path.ends_with(".config/fel-tools.toml"));
    }
}
