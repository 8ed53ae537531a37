// 🧾 Result Assembler - Project, rename and sort the final table
// Column order is fixed: identifier first, then the canonical metric columns
// that exist (aliases renamed to their canonical spelling). Sorting is Net
// Kar descending with Birim Kar as tiebreak. Nothing is filtered here - an
// earlier iteration dropped unmatched rows and that bug must not come back.

use crate::collaborator::{Collaborator, Severity};
use crate::schema::{resolve_alias, CANONICAL_COLUMNS, COL_NET_PROFIT, COL_UNIT_PROFIT};
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

// ============================================================================
// RESULT TABLE
// ============================================================================

/// The primary output artifact: immutable once assembled, held in memory for
/// the analytics layer and optionally serialized to the output workbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTable {
    pub identifier_column: String,
    pub data: RawTable,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Project the computed profitability table into the final column set and
/// sort it. Every input row appears in the output exactly once.
pub fn assemble(
    table: &RawTable,
    identifier_column: &str,
    collab: &dyn Collaborator,
) -> ResultTable {
    // (output name, source column) pairs, identifier first
    let mut selected: Vec<(String, String)> = Vec::new();

    if table.has_column(identifier_column) {
        selected.push((identifier_column.to_string(), identifier_column.to_string()));
    }

    for (canonical, _) in CANONICAL_COLUMNS {
        if let Some(source) = resolve_alias(table, canonical) {
            // dedup: the identifier may itself resolve as a canonical column
            if !selected.iter().any(|(_, src)| *src == source) {
                selected.push((canonical.to_string(), source));
            }
        }
    }

    let mut data = RawTable::new(selected.iter().map(|(out, _)| out.clone()).collect());
    for row in 0..table.len() {
        let cells = selected
            .iter()
            .map(|(_, source)| table.get(row, source))
            .collect();
        data.push_row(cells);
    }

    sort_rows(&mut data, collab);

    collab.log_event(
        &format!("✓ Result table prepared: {} products", data.len()),
        Severity::Success,
    );

    ResultTable {
        identifier_column: identifier_column.to_string(),
        data,
    }
}

/// Descending Net Kar, ties by descending Birim Kar; Birim Kar alone when
/// Net Kar is absent; input order when neither exists. Non-numeric cells
/// sort to the bottom. The sort is stable.
fn sort_rows(data: &mut RawTable, collab: &dyn Collaborator) {
    let net_idx = data.column_index(COL_NET_PROFIT);
    let unit_idx = data.column_index(COL_UNIT_PROFIT);

    let key = |row: &[Cell], idx: usize| -> f64 {
        row.get(idx)
            .and_then(Cell::as_number)
            .unwrap_or(f64::NEG_INFINITY)
    };

    match (net_idx, unit_idx) {
        (Some(net), Some(unit)) => {
            data.rows.sort_by(|a, b| {
                key(b, net)
                    .total_cmp(&key(a, net))
                    .then(key(b, unit).total_cmp(&key(a, unit)))
            });
            collab.log_event("✓ Sorted by Net Kar", Severity::Success);
        }
        (Some(net), None) => {
            data.rows.sort_by(|a, b| key(b, net).total_cmp(&key(a, net)));
            collab.log_event("✓ Sorted by Net Kar", Severity::Success);
        }
        (None, Some(unit)) => {
            data.rows.sort_by(|a, b| key(b, unit).total_cmp(&key(a, unit)));
            collab.log_event("✓ Sorted by Birim Kar", Severity::Success);
        }
        (None, None) => {}
    }
}

// ============================================================================
// TESTS
// ============================================================================
