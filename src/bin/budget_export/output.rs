//! Script-literal data file and the console summary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use fel_tools::format_amount;

use crate::budget::BudgetData;

/// Variable name read by the viewer page.
pub const VARIABLE_NAME: &str = "DATOS_PRESUPUESTO";

/// Render the data file: two comment lines, then the JSON object assigned to a constant.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render(data: &BudgetData, title: &str, updated_at: &str) -> Result<String> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize budget data")?;
    Ok(format!(
        "// Datos del {title} - Generado automaticamente\n// Ultima actualizacion: {updated_at}\nconst {VARIABLE_NAME} = {json};\n"
    ))
}

/// Write the rendered content, replacing any previous file.
///
/// # Errors
/// Returns an error if the file can't be written.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// Print the revenue, product sales and consolidated result summary.
pub fn print_summary(data: &BudgetData) {
    let product_sales = data.product_sales_total();
    let product_margin = data.product_margin_total();

    println!("\n{}", "=".repeat(50));
    println!("{}", "BUDGET DATA UPDATED".green().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "Recurring revenue:".bold());
    println!("  Total revenue:    Q {}", format_amount(data.revenue.annual));
    println!("  Direct costs:     Q {}", format_amount(data.direct_costs.annual));
    println!("  Gross margin:     {:.1}%", data.gross_margin.percent);
    println!("  Total OPEX:       Q {}", format_amount(data.opex.annual));
    println!("  Net result:       Q {}", format_amount(data.result.annual));

    println!("\n{}", "Product sales:".bold());
    println!("  Total sales:      Q {}", format_amount(product_sales));
    println!(
        "  Margin ({:.0}%):      Q {}",
        data.product_margin * 100.0,
        format_amount(product_margin)
    );

    println!("\n{}", "Consolidated:".bold());
    println!("  Total revenue:    Q {}", format_amount(data.revenue.annual + product_sales));
    println!("  Final result:     Q {}", format_amount(data.result.annual + product_margin));
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::budget::BudgetData;
    use crate::budget::tests::sample_sheet;
    use crate::forecast::parse_product_sales;

    #[test]
    fn renders_header_and_constant() {
        let data = BudgetData::from_sheet(&sample_sheet());
        let content = render(&data, "Presupuesto 2026", "2026-01-05 08:30:00").expect("render");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "// Datos del Presupuesto 2026 - Generado automaticamente");
        assert_eq!(lines[1], "// Ultima actualizacion: 2026-01-05 08:30:00");
        assert_eq!(lines[2], "const DATOS_PRESUPUESTO = {");
        assert_eq!(lines[3], r#"  "ingresos": {"#);
        assert!(content.ends_with("};\n"));
    }

    #[test]
    fn forecast_survives_a_write_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("site").join("datos-presupuesto.js");
        let sales: Vec<f64> = (1..=12).map(|month| f64::from(month) * 250.5).collect();
        let data = BudgetData::from_sheet(&sample_sheet()).with_product_sales(sales.clone());

        let content = render(&data, "Presupuesto 2026", "2026-01-05 08:30:00").expect("render");
        write_output(&path, &content).expect("write");

        let written = fs::read_to_string(&path).expect("read");
        assert_eq!(parse_product_sales(&written), Some(sales));

        let json = written
            .split_once(" = ")
            .and_then(|(_, rest)| rest.strip_suffix(";\n"))
            .expect("assignment");
        let parsed: BudgetData = serde_json::from_str(json).expect("valid JSON");
        assert_eq!(parsed.revenue.clients, data.revenue.clients);
        assert_eq!(parsed.expenses.len(), data.expenses.len());
    }
}
