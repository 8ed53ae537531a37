// 💾 Export - Two-sheet output workbook
// Sheet "Data" carries the assembled result table, sheet "Summary" the match
// statistics and aggregate metrics for the operator.

use crate::assemble::ResultTable;
use crate::matching::MatchStatistics;
use crate::schema::{COL_NET_PROFIT, COL_UNIT_COST, COL_UNIT_PROFIT};
use crate::table::Cell;
use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Write the result workbook: `Data` + `Summary`.
///
/// Summary counts are genuine numbers; the rate and averages are
/// pre-formatted strings (2 decimals, match rate to 1) so they read the
/// same in every spreadsheet viewer.
pub fn save_results(path: &Path, result: &ResultTable, stats: &MatchStatistics) -> Result<()> {
    let mut workbook = Workbook::new();

    // Data sheet
    let data_sheet = workbook.add_worksheet();
    data_sheet.set_name("Data")?;

    for (col, name) in result.data.columns.iter().enumerate() {
        data_sheet.write_string(0, col as u16, name)?;
    }
    for (row, cells) in result.data.rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let (r, c) = ((row + 1) as u32, col as u16);
            match cell {
                Cell::Number(n) => data_sheet.write_number(r, c, *n)?,
                Cell::Text(s) => data_sheet.write_string(r, c, s)?,
                Cell::Bool(b) => data_sheet.write_boolean(r, c, *b)?,
                Cell::Empty => continue,
            };
        }
    }

    // Summary sheet
    let summary = summarize(result, stats);
    let summary_sheet = workbook.add_worksheet();
    summary_sheet.set_name("Summary")?;
    summary_sheet.write_string(0, 0, "Metric")?;
    summary_sheet.write_string(0, 1, "Value")?;
    for (row, (label, value)) in summary.iter().enumerate() {
        summary_sheet.write_string((row + 1) as u32, 0, label)?;
        match value {
            Cell::Number(n) => summary_sheet.write_number((row + 1) as u32, 1, *n)?,
            other => summary_sheet.write_string((row + 1) as u32, 1, &other.as_text())?,
        };
    }

    workbook
        .save(path)
        .with_context(|| format!("cannot write workbook {}", path.display()))?;

    Ok(())
}

/// The 7 labeled summary rows.
fn summarize(result: &ResultTable, stats: &MatchStatistics) -> Vec<(String, Cell)> {
    let total = result.len();
    let unmatched = total.saturating_sub(stats.matched);

    let costs: Vec<f64> = result
        .data
        .column_values(COL_UNIT_COST)
        .iter()
        .filter_map(Cell::as_number)
        .filter(|c| *c > 0.0)
        .collect();
    let avg_unit_cost = if costs.is_empty() {
        0.0
    } else {
        costs.iter().sum::<f64>() / costs.len() as f64
    };

    let unit_profits: Vec<f64> = result
        .data
        .column_values(COL_UNIT_PROFIT)
        .iter()
        .filter_map(Cell::as_number)
        .collect();
    let avg_unit_profit = if unit_profits.is_empty() {
        0.0
    } else {
        unit_profits.iter().sum::<f64>() / unit_profits.len() as f64
    };

    let total_net_profit: f64 = result
        .data
        .column_values(COL_NET_PROFIT)
        .iter()
        .filter_map(Cell::as_number)
        .sum();

    vec![
        ("Total products".to_string(), Cell::Number(total as f64)),
        ("Matched products".to_string(), Cell::Number(stats.matched as f64)),
        ("Unmatched products".to_string(), Cell::Number(unmatched as f64)),
        ("Match rate (%)".to_string(), Cell::text(&format!("{:.1}", stats.match_rate()))),
        ("Average unit cost".to_string(), Cell::text(&format!("{:.2}", avg_unit_cost))),
        ("Average unit profit".to_string(), Cell::text(&format!("{:.2}", avg_unit_profit))),
        ("Total net profit".to_string(), Cell::text(&format!("{:.2}", total_net_profit))),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
