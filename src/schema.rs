// 📐 Schema Detector - Find header rows and semantic columns
// The two reports never agree on column naming: embedded newlines, dropped
// diacritics, "Ort.Satış Fiyat" vs "Ortalama Fiyat". Every alias list lives
// here and nowhere else.

use crate::collaborator::{Collaborator, Severity};
use crate::normalize::normalize_text;
use crate::table::{load_table, RawTable};
use anyhow::Result;
use std::path::Path;

// ============================================================================
// COLUMN ROLES
// ============================================================================

/// Semantic column roles resolved once per analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    ProductIdentifier,
    UnitPrice,
    SalesQuantity,
    SalesAmount,
    AverageSalesPrice,
    UnitCost,
}

impl ColumnRole {
    pub fn name(&self) -> &str {
        match self {
            ColumnRole::ProductIdentifier => "product identifier",
            ColumnRole::UnitPrice => "unit price",
            ColumnRole::SalesQuantity => "sales quantity",
            ColumnRole::SalesAmount => "sales amount",
            ColumnRole::AverageSalesPrice => "average sales price",
            ColumnRole::UnitCost => "unit cost",
        }
    }
}

/// One keyword rule: every group in `all` must contribute at least one hit,
/// no keyword in `none` may appear.
struct RolePattern {
    all: &'static [&'static [&'static str]],
    none: &'static [&'static str],
}

impl ColumnRole {
    /// Keyword rules in preference order; the first rule with a matching
    /// column wins, columns scanned in table order.
    fn patterns(&self) -> &'static [RolePattern] {
        match self {
            ColumnRole::ProductIdentifier => &[
                RolePattern { all: &[&["stok"], &["ismi"]], none: &[] },
                RolePattern { all: &[&["stok"], &["isim"]], none: &[] },
                RolePattern { all: &[&["stok"], &["kodu"]], none: &[] },
            ],
            // "Liste Fiyat" is the undiscounted list price, never the one
            // the dictionary should carry
            ColumnRole::UnitPrice => &[RolePattern { all: &[&["fiyat"]], none: &["liste"] }],
            ColumnRole::SalesQuantity => {
                &[RolePattern { all: &[&["satis"], &["miktar"]], none: &[] }]
            }
            ColumnRole::SalesAmount => {
                &[RolePattern { all: &[&["satis"], &["tutar"]], none: &[] }]
            }
            ColumnRole::AverageSalesPrice => {
                &[RolePattern { all: &[&["ort"], &["satis"], &["fiyat"]], none: &[] }]
            }
            ColumnRole::UnitCost => {
                &[RolePattern { all: &[&["birim"], &["maliyet"]], none: &[] }]
            }
        }
    }
}

// ============================================================================
// CANONICAL OUTPUT COLUMNS
// ============================================================================

pub const COL_SALES_QUANTITY: &str = "Satış Miktar";
pub const COL_AVG_SALES_PRICE: &str = "Ort.Satış Fiyat";
pub const COL_SALES_AMOUNT: &str = "Satış Tutar";
pub const COL_UNIT_COST: &str = "Birim Maliyet";
pub const COL_UNIT_PROFIT: &str = "Birim Kar";
pub const COL_NET_PROFIT: &str = "Net Kar";

/// Canonical output column names and the alias spellings seen in real
/// exports (embedded newlines come from merged Excel header cells).
pub const CANONICAL_COLUMNS: [(&str, &[&str]); 6] = [
    (COL_SALES_QUANTITY, &["Satış\nMiktar", "Satis Miktar", "Miktar"]),
    (COL_AVG_SALES_PRICE, &["Ort.Satış\nFiyat", "Ort Satış Fiyat", "Ortalama Fiyat"]),
    (COL_SALES_AMOUNT, &["Satış\nTutar", "Satis Tutar", "Tutar"]),
    (COL_UNIT_COST, &["Birim\nMaliyet", "Maliyet"]),
    (COL_UNIT_PROFIT, &["Birim\nKar", "Kar"]),
    (COL_NET_PROFIT, &["Net\nKar", "Toplam Kar"]),
];

/// Resolve a canonical column against a table: the canonical name itself if
/// present, otherwise the first present alias. First present wins.
pub fn resolve_alias(table: &RawTable, canonical: &str) -> Option<String> {
    if table.has_column(canonical) {
        return Some(canonical.to_string());
    }
    let aliases = CANONICAL_COLUMNS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, aliases)| *aliases)?;
    aliases
        .iter()
        .find(|alias| table.has_column(alias))
        .map(|alias| alias.to_string())
}

// ============================================================================
// DETECTION
// ============================================================================

/// First column whose folded name satisfies the role's keyword rules.
pub fn detect_column(table: &RawTable, role: ColumnRole) -> Option<String> {
    for pattern in role.patterns() {
        for column in &table.columns {
            let folded = normalize_text(column);
            let all_hit = pattern
                .all
                .iter()
                .all(|group| group.iter().any(|kw| folded.contains(kw)));
            let none_hit = pattern.none.iter().any(|kw| folded.contains(kw));
            if all_hit && !none_hit {
                return Some(column.clone());
            }
        }
    }
    None
}

/// Fallback header row when no candidate scores (a known fragility; column
/// detection downstream has its own manual fallback).
pub const DEFAULT_HEADER_ROW: usize = 1;

/// Find the header row of the profitability report by trying rows 0..=4.
///
/// A candidate qualifies when its column names contain a stock name/code
/// column AND at least two of the sales/quantity/price/amount keyword
/// groups. The file is re-parsed per candidate; load errors just skip that
/// candidate.
pub fn detect_header_row(path: &Path, collab: &dyn Collaborator) -> usize {
    for candidate in 0..=4 {
        let table = match load_table(path, candidate) {
            Ok(t) => t,
            Err(e) => {
                collab.log_event(
                    &format!("Header row {} failed to parse: {}", candidate, e),
                    Severity::Warning,
                );
                continue;
            }
        };

        if table.is_empty() {
            continue;
        }

        collab.log_event(&format!("Testing header row {}...", candidate), Severity::Info);

        if score_header(&table) {
            collab.log_event(
                &format!("✓ Header row resolved as {}", candidate),
                Severity::Success,
            );
            return candidate;
        }
    }

    collab.log_event(
        &format!("No suitable header row found, falling back to row {}", DEFAULT_HEADER_ROW),
        Severity::Warning,
    );
    DEFAULT_HEADER_ROW
}

fn score_header(table: &RawTable) -> bool {
    let folded: Vec<String> = table.columns.iter().map(|c| normalize_text(c)).collect();

    let has_stock = folded.iter().any(|c| {
        c.contains("stok") && (c.contains("ismi") || c.contains("isim") || c.contains("kodu"))
    });

    let data_groups = [
        folded.iter().any(|c| c.contains("satis")),
        folded.iter().any(|c| c.contains("miktar")),
        folded.iter().any(|c| c.contains("fiyat")),
        folded.iter().any(|c| c.contains("tutar")),
    ];
    let data_column_count = data_groups.iter().filter(|hit| **hit).count();

    has_stock && data_column_count >= 2
}

// ============================================================================
// MANDATORY RESOLUTION
// ============================================================================

/// Outcome of resolving a mandatory column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Column found (detected or manually chosen).
    Column(String),
    /// Operator declined the manual prompt - the run is cancelled.
    Declined,
}

/// Resolve a mandatory role: keyword detection first, manual selection via
/// the collaborator when detection fails.
///
/// An out-of-range selection is a hard stop (`SchemaUnresolved`), reported
/// through Err; a declined prompt is `Resolution::Declined`.
pub fn resolve_mandatory_column(
    table: &RawTable,
    role: ColumnRole,
    collab: &dyn Collaborator,
) -> Result<Resolution> {
    if let Some(column) = detect_column(table, role) {
        return Ok(Resolution::Column(column));
    }

    collab.log_event(
        &format!("{} column not detected, manual selection required...", role.name()),
        Severity::Warning,
    );

    let choice = match collab.prompt_column_choice(role.name(), &table.columns) {
        Some(idx) => idx,
        None => {
            collab.log_event(
                &format!("✗ No {} column selected, cancelling", role.name()),
                Severity::Warning,
            );
            return Ok(Resolution::Declined);
        }
    };

    match table.columns.get(choice) {
        Some(column) => Ok(Resolution::Column(column.clone())),
        None => Err(crate::pipeline::AnalysisError::SchemaUnresolved {
            role: role.name().to_string(),
            detail: format!(
                "selected index {} out of range (0-{})",
                choice,
                table.columns.len().saturating_sub(1)
            ),
        }
        .into()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
