//! Workbook access by 1-based row and column, as shown in the spreadsheet UI.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};

/// Read one worksheet into memory.
///
/// # Errors
/// Returns an error if the workbook can't be opened or has no sheet with the given name.
pub fn open_sheet(path: &Path, sheet_name: &str) -> Result<Range<Data>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook: {}", path.display()))?;
    workbook.worksheet_range(sheet_name).with_context(|| {
        format!(
            "Sheet '{sheet_name}' not found in {}. Available sheets: {}",
            path.display(),
            workbook.sheet_names().join(", ")
        )
    })
}

/// Cell at a 1-based row and column.
pub fn cell(sheet: &Range<Data>, row: u32, column: u32) -> Option<&Data> {
    if row == 0 || column == 0 {
        return None;
    }
    sheet.get_value((row - 1, column - 1))
}

/// Numeric cell value, zero for empty or non-numeric cells.
pub fn number(sheet: &Range<Data>, row: u32, column: u32) -> f64 {
    match cell(sheet, row, column) {
        Some(Data::Float(value)) => *value,
        Some(Data::Int(value)) => *value as f64,
        Some(Data::Bool(value)) => f64::from(u8::from(*value)),
        Some(Data::String(text)) => text.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Trimmed text of a string cell, `None` for blank or non-text cells.
pub fn text(sheet: &Range<Data>, row: u32, column: u32) -> Option<String> {
    match cell(sheet, row, column) {
        Some(Data::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

/// Cell content as display text, `None` for empty cells.
pub fn display(sheet: &Range<Data>, row: u32, column: u32) -> Option<String> {
    match cell(sheet, row, column) {
        None | Some(Data::Empty) => None,
        Some(Data::String(text)) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Range<Data> {
        let mut range = Range::new((0, 0), (4, 4));
        range.set_value((0, 1), Data::String("  Cliente A ".to_string()));
        range.set_value((0, 3), Data::Float(1500.5));
        range.set_value((1, 3), Data::Int(42));
        range.set_value((2, 3), Data::String("1,250.75".to_string()));
        range.set_value((3, 1), Data::String("   ".to_string()));
        range.set_value((3, 3), Data::String("n/a".to_string()));
        range
    }

    #[test]
    fn reads_one_based_positions() {
        let sheet = sheet();
        assert_eq!(text(&sheet, 1, 2).as_deref(), Some("Cliente A"));
        assert!(cell(&sheet, 0, 2).is_none());
        assert!(cell(&sheet, 50, 2).is_none());
    }

    #[test]
    fn numbers_default_to_zero() {
        let sheet = sheet();
        fel_tools::assert_f64_eq(number(&sheet, 1, 4), 1500.5);
        fel_tools::assert_f64_eq(number(&sheet, 2, 4), 42.0);
        fel_tools::assert_f64_eq(number(&sheet, 3, 4), 1250.75);
        fel_tools::assert_f64_eq(number(&sheet, 4, 4), 0.0);
        fel_tools::assert_f64_eq(number(&sheet, 5, 5), 0.0);
        fel_tools::assert_f64_eq(number(&sheet, 99, 4), 0.0);
    }

    #[test]
    fn blank_text_is_none() {
        let sheet = sheet();
        assert!(text(&sheet, 4, 2).is_none());
        assert!(text(&sheet, 1, 4).is_none());
        assert_eq!(display(&sheet, 2, 4).as_deref(), Some("42"));
        assert!(display(&sheet, 4, 2).is_none());
    }
}
