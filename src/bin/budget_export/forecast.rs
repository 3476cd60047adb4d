//! Product-sales forecast, kept in the generated data file between runs.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use colored::Colorize;
use regex::Regex;

use crate::budget::MONTHS;

static PRODUCT_SALES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""ventasProductos":\s*\[([^\]]+)\]"#).expect("Failed to compile product sales regex")
});

/// How the operator wants to update the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastChoice {
    Keep,
    Uniform,
    PerMonth,
}

impl ForecastChoice {
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Keep),
            "2" => Some(Self::Uniform),
            "3" => Some(Self::PerMonth),
            _ => None,
        }
    }
}

/// Parse the forecast array from previously generated file content.
///
/// Returns `None` unless the array holds exactly twelve numbers.
pub fn parse_product_sales(content: &str) -> Option<Vec<f64>> {
    let captures = PRODUCT_SALES_REGEX.captures(content)?;
    let values = captures[1]
        .split(',')
        .map(|value| value.trim().parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    (values.len() == MONTHS.len()).then_some(values)
}

/// Current forecast from the existing output file, zeros if missing or unreadable.
pub fn load_product_sales(path: &Path) -> Vec<f64> {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| parse_product_sales(&content))
        .unwrap_or_else(|| vec![0.0; MONTHS.len()])
}

/// Parse an amount typed by the operator, allowing thousands separators and a `Q` prefix.
pub fn parse_amount(input: &str) -> Option<f64> {
    let cleaned = input.trim().trim_start_matches(['Q', 'q']).trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Value for one month: blank keeps the current value, invalid input is `None`.
pub fn month_value(input: &str, current: f64) -> Option<f64> {
    if input.trim().is_empty() {
        Some(current)
    } else {
        parse_amount(input)
    }
}

fn print_values(values: &[f64]) {
    for (month, value) in MONTHS.iter().zip(values) {
        println!("  {month}: Q {}", fel_tools::format_amount(value));
    }
    let total: f64 = values.iter().sum();
    println!("  Annual total: Q {}", fel_tools::format_amount(total));
}

fn confirm_total(values: &[f64]) -> Result<bool> {
    let total: f64 = values.iter().sum();
    println!("\nAnnual total: Q {}", fel_tools::format_amount(total));
    fel_tools::confirm_with_user("Confirm?", false)
}

/// Ask the operator whether to keep or edit the product-sales forecast.
///
/// # Errors
/// Returns an error if reading from stdin fails.
pub fn prompt_product_sales(current: &[f64]) -> Result<Vec<f64>> {
    println!("\n{}", "=".repeat(50));
    println!("{}", "PROJECTED PRODUCT SALES".bold());
    println!("{}", "=".repeat(50));
    println!("\nCurrent values:");
    print_values(current);

    println!("\nOptions:");
    println!("  1. Keep current values");
    println!("  2. Set the same value for every month");
    println!("  3. Enter a value for each month");

    let input = fel_tools::read_input("\nSelect an option (1/2/3): ")?;
    match ForecastChoice::parse(&input) {
        Some(ForecastChoice::Uniform) => loop {
            let input = fel_tools::read_input("\nMonthly value for all months: Q ")?;
            let Some(value) = parse_amount(&input) else {
                fel_tools::print_warning!("Please enter a valid number.");
                continue;
            };
            let values = vec![value; MONTHS.len()];
            if confirm_total(&values)? {
                return Ok(values);
            }
        },
        Some(ForecastChoice::PerMonth) => {
            println!("\nEnter the sales value for each month (blank keeps the current value):");
            let mut values = Vec::with_capacity(MONTHS.len());
            for (month, &previous) in MONTHS.iter().zip(current) {
                loop {
                    let prompt = format!("  {month} (current: Q {}): Q ", fel_tools::format_amount(previous));
                    let input = fel_tools::read_input(&prompt)?;
                    if let Some(value) = month_value(&input, previous) {
                        values.push(value);
                        break;
                    }
                    fel_tools::print_warning!("    Please enter a valid number.");
                }
            }
            if confirm_total(&values)? {
                Ok(values)
            } else {
                println!("Keeping current values.");
                Ok(current.to_vec())
            }
        }
        Some(ForecastChoice::Keep) | None => {
            println!("Keeping current values.");
            Ok(current.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fel_tools::assert_f64_eq;

    #[test]
    fn parses_pretty_printed_array() {
        let content = r#"const DATOS_PRESUPUESTO = {
  "gastos": [],
  "ventasProductos": [
    1000.0,
    1000.0,
    1500.5,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    2000
  ],
  "margenProductos": 0.3
};"#;
        let values = parse_product_sales(content).expect("values");
        assert_eq!(values.len(), 12);
        assert_f64_eq(values[2], 1500.5);
        assert_f64_eq(values[11], 2000.0);
    }

    #[test]
    fn wrong_length_or_garbage_is_rejected() {
        assert!(parse_product_sales(r#""ventasProductos": [1, 2, 3]"#).is_none());
        assert!(parse_product_sales(r#""ventasProductos": [1, x, 3]"#).is_none());
        assert!(parse_product_sales("nothing here").is_none());
    }

    #[test]
    fn missing_file_gives_zeros() {
        let dir = tempfile::tempdir().expect("tempdir");
        let values = load_product_sales(&dir.path().join("missing.js"));
        assert_eq!(values, vec![0.0; 12]);
    }

    #[test]
    fn amounts_accept_separators() {
        assert_eq!(parse_amount("1,500.25"), Some(1500.25));
        assert_eq!(parse_amount(" Q 2,000 "), Some(2000.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn blank_month_keeps_current() {
        assert_eq!(month_value("", 750.0), Some(750.0));
        assert_eq!(month_value("800", 750.0), Some(800.0));
        assert_eq!(month_value("ochocientos", 750.0), None);
    }

    #[test]
    fn forecast_choices() {
        assert_eq!(ForecastChoice::parse("1"), Some(ForecastChoice::Keep));
        assert_eq!(ForecastChoice::parse(" 2"), Some(ForecastChoice::Uniform));
        assert_eq!(ForecastChoice::parse("3"), Some(ForecastChoice::PerMonth));
        assert_eq!(ForecastChoice::parse("4"), None);
    }
}
