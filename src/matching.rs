// ⚖️ Reconciliation Join - Attach unit costs to profitability rows
// Exact lookup on the normalized key. Every row survives the join: a miss
// just leaves the unit cost at zero and lands on the diagnostics list.

use crate::normalize::join_key;
use crate::pricing::PriceDictionary;
use crate::schema::COL_UNIT_COST;
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

// ============================================================================
// MATCH STATISTICS
// ============================================================================

/// Matched/unmatched bookkeeping for the summary sheet and operator feedback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total: usize,
    pub matched: usize,
    /// Identifiers without a price - diagnostic reporting only, no retry.
    pub unmatched: Vec<String>,
}

impl MatchStatistics {
    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    /// Percentage of rows that found a price.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} matched / {} unmatched ({:.1}%)",
            self.matched,
            self.unmatched_count(),
            self.match_rate()
        )
    }
}

// ============================================================================
// JOIN
// ============================================================================

/// Write the dictionary price into the unit-cost column of every matching
/// row. Row count in equals row count out - unmatched rows keep cost 0.
pub fn match_prices(
    table: &mut RawTable,
    identifier_column: &str,
    dictionary: &PriceDictionary,
) -> MatchStatistics {
    let mut stats = MatchStatistics {
        total: table.len(),
        ..Default::default()
    };

    for row in 0..table.len() {
        let key = join_key(&table.get(row, identifier_column).as_text());

        match dictionary.get(&key) {
            Some(price) => {
                table.set(row, COL_UNIT_COST, Cell::Number(price));
                stats.matched += 1;
            }
            None => stats.unmatched.push(key),
        }
    }

    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::NullCollaborator;
    use crate::pricing::build_price_dictionary;

    fn profitability_table(names: &[&str]) -> RawTable {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            COL_UNIT_COST.to_string(),
        ]);
        for name in names {
            t.push_row(vec![Cell::text(name), Cell::Number(0.0)]);
        }
        t
    }

    fn dictionary_of(entries: &[(&str, f64)]) -> PriceDictionary {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Tarih".to_string(),
            "Depo".to_string(),
            "Fiyat".to_string(),
        ]);
        for (name, price) in entries {
            t.push_row(vec![
                Cell::Empty,
                Cell::Empty,
                Cell::text(name),
                Cell::Number(*price),
            ]);
        }
        build_price_dictionary(&t, "Stok İsmi", "Fiyat", &NullCollaborator)
    }

    #[test]
    fn test_every_row_retained() {
        let mut table = profitability_table(&["COLA", "NO SUCH PRODUCT", "GAZOZ"]);
        let dict = dictionary_of(&[("COLA", 10.0), ("GAZOZ", 4.0)]);

        let stats = match_prices(&mut table, "Stok İsmi", &dict);

        assert_eq!(table.len(), 3);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.unmatched, vec!["NO SUCH PRODUCT".to_string()]);
    }

    #[test]
    fn test_matched_rows_get_price_unmatched_keep_zero() {
        let mut table = profitability_table(&["COLA", "SU"]);
        let dict = dictionary_of(&[("COLA", 12.5)]);

        match_prices(&mut table, "Stok İsmi", &dict);

        assert_eq!(table.get(0, COL_UNIT_COST), Cell::Number(12.5));
        assert_eq!(table.get(1, COL_UNIT_COST), Cell::Number(0.0));
    }

    #[test]
    fn test_lookup_is_normalization_insensitive() {
        let mut table = profitability_table(&["  cola  "]);
        let dict = dictionary_of(&[("COLA", 3.0)]);

        let stats = match_prices(&mut table, "Stok İsmi", &dict);
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn test_match_rate() {
        let stats = MatchStatistics {
            total: 4,
            matched: 3,
            unmatched: vec!["X".to_string()],
        };
        assert!((stats.match_rate() - 75.0).abs() < 1e-9);

        assert_eq!(MatchStatistics::default().match_rate(), 0.0);
    }
}
