// 🔁 Analysis Pipeline - One synchronous run from two files to a ResultTable
// The engine's single entry point. Single-threaded by design: dataset sizes
// are spreadsheet-scale. The caller owns off-thread execution; progress and
// log events flow out through the Collaborator at fixed checkpoints.

use crate::assemble::{assemble, ResultTable};
use crate::collaborator::{Collaborator, Severity};
use crate::export::save_results;
use crate::matching::{match_prices, MatchStatistics};
use crate::metrics::{clean_numeric_column, compute_profits};
use crate::normalize::join_key;
use crate::pricing::build_price_dictionary;
use crate::schema::{
    detect_header_row, resolve_mandatory_column, ColumnRole, Resolution, COL_UNIT_COST,
};
use crate::table::{load_table, Cell, RawTable};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// ERROR TAXONOMY
// ============================================================================

/// Fatal pipeline errors. Everything else degrades: numeric parse failures
/// become 0.0, match gaps become statistics, a declined save prompt becomes
/// a Cancelled outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A table has zero rows (on load or after cleaning).
    InputEmpty { context: String },
    /// A mandatory column could not be resolved.
    SchemaUnresolved { role: String, detail: String },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::InputEmpty { context } => {
                write!(f, "no data rows in {}", context)
            }
            AnalysisError::SchemaUnresolved { role, detail } => {
                write!(f, "{} column unresolved: {}", role, detail)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

// ============================================================================
// RUN CONFIGURATION & OUTCOME
// ============================================================================

/// Immutable configuration for one analysis run. No shared mutable state
/// exists beyond this value and the collaborator's own message queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub profitability_path: PathBuf,
    pub discount_path: PathBuf,
    /// When absent the collaborator is asked for a destination.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: ResultTable,
    pub stats: MatchStatistics,
    pub price_entries: usize,
    pub output_path: PathBuf,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// What `analyze` hands back. Cancelled covers a declined column prompt and
/// a declined save destination; Failed carries the logged error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    Completed(AnalysisReport),
    Cancelled,
    Failed(String),
}

impl AnalysisOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AnalysisOutcome::Completed(_))
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Run the full reconciliation pipeline.
///
/// Never propagates an error to the caller: every failure is logged through
/// the collaborator and folded into the returned outcome.
pub fn analyze(config: &RunConfig, collab: &dyn Collaborator) -> AnalysisOutcome {
    match run_pipeline(config, collab) {
        Ok(outcome) => outcome,
        Err(e) => {
            collab.log_event(&format!("✗ ERROR: {}", e), Severity::Error);
            AnalysisOutcome::Failed(e.to_string())
        }
    }
}

fn run_pipeline(config: &RunConfig, collab: &dyn Collaborator) -> Result<AnalysisOutcome> {
    collab.report_progress(15, "Loading discount report...");

    let mut discount = load_table(&config.discount_path, 0)?;
    if discount.is_empty() {
        return Err(AnalysisError::InputEmpty {
            context: "discount report".to_string(),
        }
        .into());
    }
    collab.log_event(
        &format!("✓ Discount report: {} rows loaded", discount.len()),
        Severity::Success,
    );

    collab.report_progress(25, "Loading profitability report...");

    let header_row = detect_header_row(&config.profitability_path, collab);
    let mut profitability = load_table(&config.profitability_path, header_row)?;
    if profitability.is_empty() {
        return Err(AnalysisError::InputEmpty {
            context: "profitability report".to_string(),
        }
        .into());
    }
    collab.log_event("✓ Profitability report loaded", Severity::Success);

    collab.report_progress(40, "Analyzing columns...");

    let identifier_column =
        match resolve_mandatory_column(&profitability, ColumnRole::ProductIdentifier, collab)? {
            Resolution::Column(c) => c,
            Resolution::Declined => return Ok(AnalysisOutcome::Cancelled),
        };
    collab.log_event(&format!("✓ Stock column: {}", identifier_column), Severity::Success);

    let price_column = match resolve_mandatory_column(&discount, ColumnRole::UnitPrice, collab)? {
        Resolution::Column(c) => c,
        Resolution::Declined => return Ok(AnalysisOutcome::Cancelled),
    };
    let discount_identifier =
        match resolve_mandatory_column(&discount, ColumnRole::ProductIdentifier, collab)? {
            Resolution::Column(c) => c,
            Resolution::Declined => return Ok(AnalysisOutcome::Cancelled),
        };
    collab.log_event(
        &format!("✓ Columns resolved: stock={}, price={}", discount_identifier, price_column),
        Severity::Success,
    );

    collab.report_progress(60, "Cleaning data...");
    clean_profitability(&mut profitability, &identifier_column);
    if profitability.is_empty() {
        return Err(AnalysisError::InputEmpty {
            context: "profitability report after cleaning".to_string(),
        }
        .into());
    }

    collab.report_progress(70, "Processing price data...");
    clean_numeric_column(&mut discount, &price_column, collab);

    collab.report_progress(80, "Building price dictionary...");
    let dictionary = build_price_dictionary(&discount, &discount_identifier, &price_column, collab);
    collab.log_event(
        &format!("✓ Prices collected for {} products", dictionary.len()),
        Severity::Success,
    );

    collab.report_progress(85, "Matching stock items...");
    let stats = match_prices(&mut profitability, &identifier_column, &dictionary);
    collab.log_event(&format!("✓ Matching complete: {}", stats.summary()), Severity::Success);

    collab.report_progress(90, "Computing profits...");
    compute_profits(&mut profitability, collab);

    collab.report_progress(95, "Saving results...");
    let result = assemble(&profitability, &identifier_column, collab);

    let output_path = match config.output_path.clone().or_else(|| collab.prompt_save_path()) {
        Some(p) => p,
        None => {
            collab.log_event("Save cancelled, no output file written", Severity::Warning);
            return Ok(AnalysisOutcome::Cancelled);
        }
    };
    save_results(&output_path, &result, &stats)?;
    collab.log_event(&format!("✓ Results saved: {}", output_path.display()), Severity::Success);

    collab.report_progress(100, "Analysis complete");

    Ok(AnalysisOutcome::Completed(AnalysisReport {
        result,
        stats: stats.clone(),
        price_entries: dictionary.len(),
        output_path,
        completed_at: chrono::Utc::now(),
    }))
}

// ============================================================================
// CLEANING
// ============================================================================

/// Markers of report-generated aggregate rows, never real products.
const AGGREGATE_MARKERS: [&str; 3] = ["TOPLAM", "TOTAL", "GENEL"];

/// Prepare the profitability table for the join: a zeroed unit-cost column,
/// blank-identifier rows dropped, identifiers join-normalized, aggregate
/// (grand-total) rows removed.
///
/// The discount table is deliberately left untouched: its section-header
/// rows have blank identifiers and the dictionary builder needs them.
fn clean_profitability(table: &mut RawTable, identifier_column: &str) {
    table.add_column(COL_UNIT_COST, Cell::Number(0.0));

    let idx = match table.column_index(identifier_column) {
        Some(i) => i,
        None => return,
    };

    table.retain_rows(|row| !row.get(idx).map(Cell::is_blank).unwrap_or(true));

    for row in 0..table.len() {
        let key = join_key(&table.get(row, identifier_column).as_text());
        table.set(row, identifier_column, Cell::Text(key));
    }

    table.retain_rows(|row| {
        let text = row.get(idx).map(Cell::as_text).unwrap_or_default();
        !AGGREGATE_MARKERS.iter().any(|m| text.contains(m))
    });
}

// ============================================================================
// TESTS
// ============================================================================
