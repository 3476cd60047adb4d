//! Budget data extracted from the workbook.
//!
//! Row and column positions follow the budget workbook template.
//! Serialized field names are the ones read by the viewer page.

use calamine::{Data, Range};
use serde::{Deserialize, Serialize};

use crate::sheet;

pub const MONTHS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Gross margin applied to projected product sales.
pub const PRODUCT_MARGIN: f64 = 0.30;

const LABEL_COLUMN: u32 = 2;
const FIRST_MONTH_COLUMN: u32 = 4;
const TOTAL_COLUMN: u32 = 16;

const CLIENT_ROWS: std::ops::RangeInclusive<u32> = 3..=50;
const REVENUE_TOTAL_ROW: u32 = 52;
const DIRECT_COST_ROWS: [(u32, &str); 3] = [
    (62, "Comisiones Recurrentes"),
    (63, "Comisiones Gerencia"),
    (64, "Costes Servidores"),
];
const DIRECT_COST_TOTAL_ROW: u32 = 68;
const GROSS_MARGIN_ROW: u32 = 70;
const CONSULTANT_ROWS: std::ops::RangeInclusive<u32> = 73..=79;
const SOFTWARE_ROWS: std::ops::RangeInclusive<u32> = 89..=105;
const OTHER_ROWS: std::ops::RangeInclusive<u32> = 111..=119;
const OPEX_TOTAL_ROW: u32 = 123;
const OPERATING_RESULT_ROW: u32 = 152;

pub const CONSULTANTS: &str = "Consultores";
pub const SOFTWARE: &str = "Software";
pub const OTHER: &str = "Otros";

/// Client labels containing any of these are subtotal rows, not clients.
const SUMMARY_KEYWORDS: [&str; 4] = ["ingresos", "ventas", "total", "reduccion"];

/// One budget row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "mensual")]
    pub monthly: Vec<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    #[serde(rename = "clientes")]
    pub clients: Vec<BudgetLine>,
    #[serde(rename = "totalMensual")]
    pub monthly: Vec<f64>,
    #[serde(rename = "totalAnual")]
    pub annual: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectCosts {
    #[serde(rename = "detalle")]
    pub detail: Vec<BudgetLine>,
    #[serde(rename = "totalMensual")]
    pub monthly: Vec<f64>,
    #[serde(rename = "totalAnual")]
    pub annual: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrossMargin {
    #[serde(rename = "mensual")]
    pub monthly: Vec<f64>,
    #[serde(rename = "anual")]
    pub annual: f64,
    #[serde(rename = "porcentaje")]
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingExpenses {
    #[serde(rename = "consultores")]
    pub consultants: Vec<BudgetLine>,
    pub software: Vec<BudgetLine>,
    #[serde(rename = "otros")]
    pub other: Vec<BudgetLine>,
    #[serde(rename = "totalMensual")]
    pub monthly: Vec<f64>,
    #[serde(rename = "totalAnual")]
    pub annual: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingResult {
    #[serde(rename = "mensual")]
    pub monthly: Vec<f64>,
    #[serde(rename = "anual")]
    pub annual: f64,
    #[serde(rename = "margenOperativo")]
    pub margin_percent: f64,
}

/// Everything written to the data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetData {
    #[serde(rename = "ingresos")]
    pub revenue: Revenue,
    #[serde(rename = "costos")]
    pub direct_costs: DirectCosts,
    #[serde(rename = "margenBruto")]
    pub gross_margin: GrossMargin,
    pub opex: OperatingExpenses,
    #[serde(rename = "resultado")]
    pub result: OperatingResult,
    /// Direct costs and operating expenses ranked by annual total.
    #[serde(rename = "gastos")]
    pub expenses: Vec<BudgetLine>,
    #[serde(rename = "ventasProductos")]
    pub product_sales: Vec<f64>,
    #[serde(rename = "margenProductos")]
    pub product_margin: f64,
}

impl BudgetData {
    /// Extract budget data from the sheet. Product sales start at zero.
    pub fn from_sheet(sheet: &Range<Data>) -> Self {
        let revenue = Revenue {
            clients: client_lines(sheet),
            monthly: monthly(sheet, REVENUE_TOTAL_ROW),
            annual: annual(sheet, REVENUE_TOTAL_ROW),
        };
        let direct_costs = DirectCosts {
            detail: direct_cost_lines(sheet),
            monthly: monthly(sheet, DIRECT_COST_TOTAL_ROW),
            annual: annual(sheet, DIRECT_COST_TOTAL_ROW),
        };
        let opex = OperatingExpenses {
            consultants: category_lines(sheet, CONSULTANT_ROWS, CONSULTANTS),
            software: category_lines(sheet, SOFTWARE_ROWS, SOFTWARE),
            other: category_lines(sheet, OTHER_ROWS, OTHER),
            monthly: monthly(sheet, OPEX_TOTAL_ROW),
            annual: annual(sheet, OPEX_TOTAL_ROW),
        };

        let gross_annual = annual(sheet, GROSS_MARGIN_ROW);
        let result_annual = annual(sheet, OPERATING_RESULT_ROW);

        let mut expenses: Vec<BudgetLine> = direct_costs
            .detail
            .iter()
            .chain(&opex.consultants)
            .chain(&opex.software)
            .chain(&opex.other)
            .cloned()
            .collect();
        sort_descending(&mut expenses);

        Self {
            gross_margin: GrossMargin {
                monthly: monthly(sheet, GROSS_MARGIN_ROW),
                annual: gross_annual,
                percent: percent_of(gross_annual, revenue.annual),
            },
            result: OperatingResult {
                monthly: monthly(sheet, OPERATING_RESULT_ROW),
                annual: result_annual,
                margin_percent: percent_of(result_annual, revenue.annual),
            },
            revenue,
            direct_costs,
            opex,
            expenses,
            product_sales: vec![0.0; MONTHS.len()],
            product_margin: PRODUCT_MARGIN,
        }
    }

    #[must_use]
    pub fn with_product_sales(mut self, sales: Vec<f64>) -> Self {
        self.product_sales = sales;
        self
    }

    pub fn product_sales_total(&self) -> f64 {
        self.product_sales.iter().sum()
    }

    pub fn product_margin_total(&self) -> f64 {
        self.product_sales_total() * self.product_margin
    }
}

/// Monthly values from columns D to O.
fn monthly(sheet: &Range<Data>, row: u32) -> Vec<f64> {
    (FIRST_MONTH_COLUMN..FIRST_MONTH_COLUMN + MONTHS.len() as u32)
        .map(|column| sheet::number(sheet, row, column))
        .collect()
}

/// Annual total from column P.
fn annual(sheet: &Range<Data>, row: u32) -> f64 {
    sheet::number(sheet, row, TOTAL_COLUMN)
}

fn percent_of(value: f64, revenue: f64) -> f64 {
    if revenue > 0.0 { value / revenue * 100.0 } else { 0.0 }
}

fn is_summary_label(label: &str) -> bool {
    let label = label.to_lowercase();
    SUMMARY_KEYWORDS.iter().any(|keyword| label.contains(keyword))
}

fn sort_descending(lines: &mut [BudgetLine]) {
    lines.sort_by(|a, b| b.total.total_cmp(&a.total));
}

/// Line for the row if its annual total is positive.
fn line(sheet: &Range<Data>, row: u32, name: String, category: Option<&str>) -> Option<BudgetLine> {
    let total = annual(sheet, row);
    (total > 0.0).then(|| BudgetLine {
        name,
        category: category.map(ToString::to_string),
        monthly: monthly(sheet, row),
        total,
    })
}

fn client_lines(sheet: &Range<Data>) -> Vec<BudgetLine> {
    let mut clients: Vec<BudgetLine> = CLIENT_ROWS
        .filter_map(|row| {
            let name = sheet::text(sheet, row, LABEL_COLUMN).filter(|name| !is_summary_label(name))?;
            line(sheet, row, name, None)
        })
        .collect();
    sort_descending(&mut clients);
    clients
}

fn direct_cost_lines(sheet: &Range<Data>) -> Vec<BudgetLine> {
    let mut costs: Vec<BudgetLine> = DIRECT_COST_ROWS
        .iter()
        .filter_map(|&(row, default_name)| {
            let name = sheet::display(sheet, row, LABEL_COLUMN).unwrap_or_else(|| default_name.to_string());
            line(sheet, row, name, None)
        })
        .collect();
    sort_descending(&mut costs);
    costs
}

fn category_lines(sheet: &Range<Data>, rows: std::ops::RangeInclusive<u32>, category: &str) -> Vec<BudgetLine> {
    let mut lines: Vec<BudgetLine> = rows
        .filter_map(|row| {
            let name = sheet::text(sheet, row, LABEL_COLUMN)?;
            line(sheet, row, name, Some(category))
        })
        .collect();
    sort_descending(&mut lines);
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use fel_tools::assert_f64_eq;

    /// Write a labeled row with the same value every month.
    pub(crate) fn set_row(range: &mut Range<Data>, row: u32, label: Option<&str>, month_value: f64) {
        if let Some(label) = label {
            range.set_value((row - 1, LABEL_COLUMN - 1), Data::String(label.to_string()));
        }
        for column in FIRST_MONTH_COLUMN..FIRST_MONTH_COLUMN + 12 {
            range.set_value((row - 1, column - 1), Data::Float(month_value));
        }
        range.set_value((row - 1, TOTAL_COLUMN - 1), Data::Float(month_value * 12.0));
    }

    pub(crate) fn sample_sheet() -> Range<Data> {
        let mut range = Range::new((0, 0), (OPERATING_RESULT_ROW, TOTAL_COLUMN));
        set_row(&mut range, 3, Some("Cliente Pequeño"), 100.0);
        set_row(&mut range, 4, Some("Cliente Grande"), 900.0);
        set_row(&mut range, 5, Some("Total Ingresos"), 1000.0);
        set_row(&mut range, 6, Some("Ventas Proyectadas"), 50.0);
        set_row(&mut range, 7, Some("Cliente Sin Ventas"), 0.0);
        set_row(&mut range, 8, Some("Reduccion de tarifa"), 10.0);
        set_row(&mut range, REVENUE_TOTAL_ROW, Some("TOTAL"), 1000.0);

        set_row(&mut range, 62, None, 50.0);
        set_row(&mut range, 63, Some("Comisiones Dirección"), 80.0);
        set_row(&mut range, 64, Some("Servidores"), 0.0);
        set_row(&mut range, DIRECT_COST_TOTAL_ROW, None, 130.0);
        set_row(&mut range, GROSS_MARGIN_ROW, None, 870.0);

        set_row(&mut range, 73, Some("Consultor A"), 60.0);
        set_row(&mut range, 74, Some("Consultor B"), 120.0);
        set_row(&mut range, 89, Some("Hosting"), 30.0);
        set_row(&mut range, 90, Some("Licencias"), -5.0);
        set_row(&mut range, 111, Some("Oficina"), 200.0);
        set_row(&mut range, OPEX_TOTAL_ROW, None, 405.0);
        set_row(&mut range, OPERATING_RESULT_ROW, None, 465.0);
        range
    }

    fn names(lines: &[BudgetLine]) -> Vec<&str> {
        lines.iter().map(|line| line.name.as_str()).collect()
    }

    #[test]
    fn clients_skip_summary_rows_and_zero_totals() {
        let data = BudgetData::from_sheet(&sample_sheet());
        assert_eq!(names(&data.revenue.clients), vec!["Cliente Grande", "Cliente Pequeño"]);
        assert_f64_eq(data.revenue.annual, 12_000.0);
        assert_eq!(data.revenue.monthly.len(), 12);
        assert!(data.revenue.clients.iter().all(|line| line.category.is_none()));
    }

    #[test]
    fn direct_costs_use_default_names() {
        let data = BudgetData::from_sheet(&sample_sheet());
        assert_eq!(
            names(&data.direct_costs.detail),
            vec!["Comisiones Dirección", "Comisiones Recurrentes"]
        );
        assert_f64_eq(data.direct_costs.annual, 1560.0);
    }

    #[test]
    fn operating_expenses_by_category() {
        let data = BudgetData::from_sheet(&sample_sheet());
        assert_eq!(names(&data.opex.consultants), vec!["Consultor B", "Consultor A"]);
        assert_eq!(names(&data.opex.software), vec!["Hosting"]);
        assert_eq!(names(&data.opex.other), vec!["Oficina"]);
        assert_eq!(data.opex.software[0].category.as_deref(), Some(SOFTWARE));
    }

    #[test]
    fn margins_are_relative_to_revenue() {
        let data = BudgetData::from_sheet(&sample_sheet());
        assert_f64_eq(data.gross_margin.percent, 87.0);
        assert_f64_eq(data.result.margin_percent, 46.5);
    }

    #[test]
    fn margins_are_zero_without_revenue() {
        let mut range = Range::new((0, 0), (OPERATING_RESULT_ROW, TOTAL_COLUMN));
        set_row(&mut range, GROSS_MARGIN_ROW, None, -10.0);
        let data = BudgetData::from_sheet(&range);
        assert_f64_eq(data.gross_margin.percent, 0.0);
        assert_f64_eq(data.result.margin_percent, 0.0);
        assert!(data.expenses.is_empty());
    }

    #[test]
    fn expense_ranking_combines_all_categories() {
        let data = BudgetData::from_sheet(&sample_sheet());
        assert_eq!(
            names(&data.expenses),
            vec![
                "Oficina",
                "Consultor B",
                "Comisiones Dirección",
                "Consultor A",
                "Comisiones Recurrentes",
                "Hosting"
            ]
        );
    }

    #[test]
    fn serializes_viewer_field_names_in_order() {
        let data = BudgetData::from_sheet(&sample_sheet()).with_product_sales(vec![1000.0; 12]);
        let json = serde_json::to_string(&data).expect("serialize");
        let keys = [
            "\"ingresos\"",
            "\"costos\"",
            "\"margenBruto\"",
            "\"opex\"",
            "\"resultado\"",
            "\"gastos\"",
            "\"ventasProductos\"",
            "\"margenProductos\"",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|key| json.find(key).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(json.contains(r#"{"nombre":"Cliente Grande","mensual":[900.0"#));
        assert!(json.contains(r#""categoria":"Consultores""#));
        assert_f64_eq(data.product_margin_total(), 3600.0);
    }
}
