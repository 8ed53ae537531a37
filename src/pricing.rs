// 💰 Price Dictionary Builder - Unit prices from the discount report
// The discount report is not really tabular: each pricing block starts with a
// "section header" row whose identifier and date cells are blank while the
// Depo column carries the actual product name. Only those rows hold the
// negotiated price we want.

use crate::collaborator::{Collaborator, Severity};
use crate::normalize::{join_key, parse_numeric, round2};
use crate::table::RawTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Date column of the discount report (blank on section-header rows).
pub const COL_DATE: &str = "Tarih";
/// Depot/region column that doubles as the product name on section headers.
pub const COL_DEPOT: &str = "Depo";
/// Depot values with this prefix are region headers, not products.
pub const REGION_HEADER_PREFIX: &str = "İZMİR BÖLGE";

// ============================================================================
// PRICE DICTIONARY
// ============================================================================

/// Normalized product key → unit price, 2-dp rounded. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceDictionary {
    entries: HashMap<String, f64>,
}

impl PriceDictionary {
    pub fn new() -> Self {
        PriceDictionary {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert unless the key already exists. Earlier rows of the report are
    /// the more specific price tier, so the first price always wins.
    fn insert_first(&mut self, key: String, price: f64) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, round2(price));
        true
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Extract the key → price mapping from the discount report.
///
/// Per row: when both the identifier cell and the `Tarih` cell are blank,
/// the `Depo` value is the true product name for that section. Rows are
/// skipped when the depot value is blank, carries the region-header prefix,
/// or the price is not positive. First occurrence of a key wins; later
/// duplicates are discarded.
///
/// This is a reverse-engineered convention of one report vendor, preserved
/// exactly. It assumes the report is pre-sorted by price-validity recency -
/// the blank date cell means no date field can be consulted instead.
pub fn build_price_dictionary(
    table: &RawTable,
    identifier_column: &str,
    price_column: &str,
    collab: &dyn Collaborator,
) -> PriceDictionary {
    let mut dictionary = PriceDictionary::new();
    let mut logged = 0;

    for row in 0..table.len() {
        let identifier_blank = table.get(row, identifier_column).is_blank();
        let date_blank = table.get(row, COL_DATE).is_blank();

        if !(identifier_blank && date_blank) {
            continue;
        }

        let depot_cell = table.get(row, COL_DEPOT);
        if depot_cell.is_blank() {
            continue;
        }

        // The region-header check runs on the raw trimmed text: the vendor
        // prints the prefix in exactly this casing, and a depot that merely
        // uppercases to it is a product name
        let depot = depot_cell.as_text();
        if depot.trim().starts_with(REGION_HEADER_PREFIX) {
            continue;
        }

        // Same trim+uppercase normalization as the profitability side, so
        // the join later is an exact lookup
        let key = join_key(&depot);
        if key.is_empty() {
            continue;
        }

        let price = parse_numeric(&table.get(row, price_column));
        if price <= 0.0 {
            continue;
        }

        if dictionary.insert_first(key.clone(), price) && logged < 5 {
            collab.log_event(&format!("Price match: {} → {}", key, price), Severity::Info);
            logged += 1;
        }
    }

    dictionary
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::NullCollaborator;
    use crate::table::{Cell, RawTable};

    fn discount_table(rows: Vec<(Cell, Cell, Cell, Cell)>) -> RawTable {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Tarih".to_string(),
            "Depo".to_string(),
            "Fiyat".to_string(),
        ]);
        for (stock, date, depot, price) in rows {
            t.push_row(vec![stock, date, depot, price]);
        }
        t
    }

    #[test]
    fn test_section_header_rows_become_entries() {
        let t = discount_table(vec![
            (Cell::Empty, Cell::Empty, Cell::text("COLA ZERO"), Cell::Number(12.345)),
            // detail row: identifier present, never inserted
            (Cell::text("COLA ZERO"), Cell::text("01.02.2024"), Cell::text("MERKEZ"), Cell::Number(99.0)),
        ]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("COLA ZERO"), Some(12.35)); // 2-dp rounded
    }

    #[test]
    fn test_first_occurrence_wins() {
        let t = discount_table(vec![
            (Cell::Empty, Cell::Empty, Cell::text("GAZOZ"), Cell::Number(10.0)),
            (Cell::Empty, Cell::Empty, Cell::text("GAZOZ"), Cell::Number(20.0)),
        ]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.get("GAZOZ"), Some(10.0));
    }

    #[test]
    fn test_non_positive_price_never_inserted() {
        let t = discount_table(vec![
            (Cell::Empty, Cell::Empty, Cell::text("SU"), Cell::Number(0.0)),
            (Cell::Empty, Cell::Empty, Cell::text("AYRAN"), Cell::Number(-3.0)),
        ]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_blank_depot_skipped() {
        let t = discount_table(vec![
            (Cell::Empty, Cell::Empty, Cell::Empty, Cell::Number(5.0)),
            (Cell::Empty, Cell::Empty, Cell::text("nan"), Cell::Number(5.0)),
        ]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_region_header_prefix_skipped() {
        let t = discount_table(vec![
            (Cell::Empty, Cell::Empty, Cell::text("İZMİR BÖLGE MÜDÜRLÜĞÜ"), Cell::Number(5.0)),
            (Cell::Empty, Cell::Empty, Cell::text("COLA"), Cell::Number(5.0)),
        ]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.len(), 1);
        assert!(dict.contains("COLA"));
    }

    #[test]
    fn test_region_header_prefix_is_case_exact() {
        // only the vendor's exact uppercase spelling marks a region header;
        // a depot that merely uppercases to it is a product
        let t = discount_table(vec![(
            Cell::Empty,
            Cell::Empty,
            Cell::text("İZMİR bölge gazozu"),
            Cell::Number(5.0),
        )]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.len(), 1);
        assert!(dict.contains("İZMİR BÖLGE GAZOZU"));
    }

    #[test]
    fn test_date_present_means_not_a_section_header() {
        let t = discount_table(vec![(
            Cell::Empty,
            Cell::text("01.02.2024"),
            Cell::text("COLA"),
            Cell::Number(5.0),
        )]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_keys_are_join_normalized() {
        let t = discount_table(vec![(
            Cell::Empty,
            Cell::Empty,
            Cell::text("  cola zero  "),
            Cell::text("₺12,50"),
        )]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.get("COLA ZERO"), Some(12.5));
    }

    #[test]
    fn test_missing_date_column_reads_as_blank() {
        // some exports drop the Tarih column entirely
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Depo".to_string(),
            "Fiyat".to_string(),
        ]);
        t.push_row(vec![Cell::Empty, Cell::text("COLA"), Cell::Number(7.0)]);

        let dict = build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator);
        assert_eq!(dict.get("COLA"), Some(7.0));
    }
}
