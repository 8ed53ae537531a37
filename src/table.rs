// 📋 Raw Tables - Untyped spreadsheet data as loaded from disk
// A RawTable is the grid exactly as the export produced it: named columns,
// rows of untyped scalars, header position already resolved by the caller.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// CELLS
// ============================================================================

/// One untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    /// Blank means: empty, whitespace-only, or the literal `nan` marker that
    /// spreadsheet/CSV round-trips leave behind for missing values.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
            _ => false,
        }
    }

    /// Display form of the cell; Empty renders as "".
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => format!("{}", b),
        }
    }

    /// Tolerant numeric view: plain parse only, no separator heuristics.
    /// Used by the analytics layer where non-numeric cells are skipped.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// Ordered columns + rows of untyped cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        RawTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (row, column name); Empty when the column does not exist or
    /// the row is ragged.
    pub fn get(&self, row: usize, column: &str) -> Cell {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .get(row)
                .and_then(|r| r.get(idx))
                .cloned()
                .unwrap_or(Cell::Empty),
            None => Cell::Empty,
        }
    }

    pub fn set(&mut self, row: usize, column: &str, value: Cell) {
        if let Some(idx) = self.column_index(column) {
            if let Some(r) = self.rows.get_mut(row) {
                if idx < r.len() {
                    r[idx] = value;
                }
            }
        }
    }

    /// Append a column filled with the given cell (no-op if it exists).
    pub fn add_column(&mut self, name: &str, fill: Cell) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        // Pad ragged rows so every row matches the column count
        while row.len() < self.columns.len() {
            row.push(Cell::Empty);
        }
        row.truncate(self.columns.len());
        self.rows.push(row);
    }

    /// Keep only rows matching the predicate (cleaning stage).
    pub fn retain_rows<F: FnMut(&[Cell]) -> bool>(&mut self, mut pred: F) {
        self.rows.retain(|r| pred(r));
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Vec<Cell> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .map(|r| r.get(idx).cloned().unwrap_or(Cell::Empty))
                .collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load a spreadsheet into a RawTable, using `header_row` (0-based) as the
/// column-name row. Rows above the header are discarded.
///
/// Dispatches on extension: `.csv` through the csv crate, everything else
/// through calamine (xlsx/xls/ods, auto-detected).
pub fn load_table(path: &Path, header_row: usize) -> Result<RawTable> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        load_csv_table(path, header_row)
    } else {
        load_workbook_table(path, header_row)
    }
}

fn load_workbook_table(path: &Path, header_row: usize) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("cannot open workbook {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow::anyhow!("workbook {} has no sheets", path.display()))?
        .with_context(|| format!("cannot read first sheet of {}", path.display()))?;

    let mut rows = range.rows().skip(header_row);

    let header = match rows.next() {
        Some(r) => r,
        None => return Ok(RawTable::default()),
    };

    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(&convert_cell(cell), i))
        .collect();

    let mut table = RawTable::new(columns);
    for row in rows {
        table.push_row(row.iter().map(convert_cell).collect());
    }

    Ok(table)
}

fn load_csv_table(path: &Path, header_row: usize) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("cannot open CSV {}", path.display()))?;

    let mut records = reader.records();
    for _ in 0..header_row {
        if records.next().transpose().context("CSV read error")?.is_none() {
            return Ok(RawTable::default());
        }
    }
    let header = match records.next() {
        Some(r) => r.context("CSV read error")?,
        None => return Ok(RawTable::default()),
    };

    let columns = header
        .iter()
        .enumerate()
        .map(|(i, field)| header_name(&Cell::text(field), i))
        .collect();

    let mut table = RawTable::new(columns);
    for record in records {
        let record = record.context("CSV read error")?;
        table.push_row(record.iter().map(csv_cell).collect());
    }

    Ok(table)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

/// CSV has no types: infer numbers where the field parses cleanly.
fn csv_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) => Cell::Number(n),
        Err(_) => Cell::Text(field.to_string()),
    }
}

fn header_name(cell: &Cell, index: usize) -> String {
    if cell.is_blank() {
        format!("Column {}", index)
    } else {
        cell.as_text().trim().to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
