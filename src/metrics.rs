// 📈 Metrics Calculator - Unit profit and net profit per row
// Birim Kar = average sales price - unit cost; Net Kar = Birim Kar × sales
// quantity. A missing source column degrades the metric to zero for every
// row and logs a warning; it never aborts the run.

use crate::collaborator::{Collaborator, Severity};
use crate::normalize::{parse_numeric, parse_numeric_checked};
use crate::schema::{
    detect_column, resolve_alias, ColumnRole, COL_AVG_SALES_PRICE, COL_NET_PROFIT,
    COL_SALES_QUANTITY, COL_UNIT_COST, COL_UNIT_PROFIT,
};
use crate::table::{Cell, RawTable};

/// Resolve a metric source column: keyword detection first, then the
/// documented alias list (first present wins).
fn resolve_source_column(table: &RawTable, role: ColumnRole, canonical: &str) -> Option<String> {
    detect_column(table, role).or_else(|| resolve_alias(table, canonical))
}

/// Overwrite a column with its parsed numeric values, reporting parse
/// failures in aggregate (never per cell - a bad export would flood the log).
pub fn clean_numeric_column(table: &mut RawTable, column: &str, collab: &dyn Collaborator) {
    let mut failures = 0;
    for row in 0..table.len() {
        let cell = table.get(row, column);
        let parsed = match parse_numeric_checked(&cell) {
            Some(value) => value,
            None => {
                if !cell.is_blank() {
                    failures += 1;
                }
                0.0
            }
        };
        table.set(row, column, Cell::Number(parsed));
    }

    if failures > 0 {
        collab.log_event(
            &format!("{} values in '{}' could not be parsed, treated as 0", failures, column),
            Severity::Warning,
        );
    }
}

/// Compute Birim Kar and Net Kar for every row of the (already matched)
/// profitability table.
pub fn compute_profits(table: &mut RawTable, collab: &dyn Collaborator) {
    // Birim Kar
    let price_column =
        resolve_source_column(table, ColumnRole::AverageSalesPrice, COL_AVG_SALES_PRICE);

    table.add_column(COL_UNIT_PROFIT, Cell::Number(0.0));

    match price_column {
        Some(column) => {
            clean_numeric_column(table, &column, collab);
            for row in 0..table.len() {
                let price = parse_numeric(&table.get(row, &column));
                let cost = parse_numeric(&table.get(row, COL_UNIT_COST));
                table.set(row, COL_UNIT_PROFIT, Cell::Number(price - cost));
            }
            collab.log_event("✓ Birim Kar computed", Severity::Success);
        }
        None => {
            collab.log_event(
                "Ort.Satış Fiyat column not found, Birim Kar defaulted to 0",
                Severity::Warning,
            );
        }
    }

    // Net Kar
    let quantity_column =
        resolve_source_column(table, ColumnRole::SalesQuantity, COL_SALES_QUANTITY);

    table.add_column(COL_NET_PROFIT, Cell::Number(0.0));

    match quantity_column {
        Some(column) => {
            clean_numeric_column(table, &column, collab);
            for row in 0..table.len() {
                let unit_profit = parse_numeric(&table.get(row, COL_UNIT_PROFIT));
                let quantity = parse_numeric(&table.get(row, &column));
                table.set(row, COL_NET_PROFIT, Cell::Number(unit_profit * quantity));
            }
            collab.log_event("✓ Net Kar computed", Severity::Success);
        }
        None => {
            collab.log_event(
                "Satış Miktar column not found, Net Kar defaulted to 0",
                Severity::Warning,
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::NullCollaborator;

    fn matched_table(rows: Vec<(&str, Cell, Cell, f64)>) -> RawTable {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Satış Miktar".to_string(),
            "Ort.Satış Fiyat".to_string(),
            COL_UNIT_COST.to_string(),
        ]);
        for (name, quantity, price, cost) in rows {
            t.push_row(vec![Cell::text(name), quantity, price, Cell::Number(cost)]);
        }
        t
    }

    #[test]
    fn test_unit_and_net_profit() {
        let mut t = matched_table(vec![
            ("A", Cell::Number(10.0), Cell::Number(100.0), 60.0),
            ("B", Cell::Number(5.0), Cell::Number(50.0), 70.0),
        ]);

        compute_profits(&mut t, &NullCollaborator);

        assert_eq!(t.get(0, COL_UNIT_PROFIT), Cell::Number(40.0));
        assert_eq!(t.get(0, COL_NET_PROFIT), Cell::Number(400.0));
        assert_eq!(t.get(1, COL_UNIT_PROFIT), Cell::Number(-20.0));
        assert_eq!(t.get(1, COL_NET_PROFIT), Cell::Number(-100.0));
    }

    #[test]
    fn test_textual_numbers_go_through_the_normalizer() {
        let mut t = matched_table(vec![(
            "A",
            Cell::text("1.000,00"),
            Cell::text("₺2,50"),
            1.0,
        )]);

        compute_profits(&mut t, &NullCollaborator);

        assert_eq!(t.get(0, COL_UNIT_PROFIT), Cell::Number(1.5));
        assert_eq!(t.get(0, COL_NET_PROFIT), Cell::Number(1500.0));
    }

    #[test]
    fn test_missing_price_column_degrades_to_zero() {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Satış Miktar".to_string(),
            COL_UNIT_COST.to_string(),
        ]);
        t.push_row(vec![Cell::text("A"), Cell::Number(10.0), Cell::Number(5.0)]);

        compute_profits(&mut t, &NullCollaborator);

        assert_eq!(t.get(0, COL_UNIT_PROFIT), Cell::Number(0.0));
        assert_eq!(t.get(0, COL_NET_PROFIT), Cell::Number(0.0));
    }

    #[test]
    fn test_alias_columns_resolve() {
        let mut t = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Miktar".to_string(),
            "Ortalama Fiyat".to_string(),
            COL_UNIT_COST.to_string(),
        ]);
        t.push_row(vec![
            Cell::text("A"),
            Cell::Number(2.0),
            Cell::Number(8.0),
            Cell::Number(3.0),
        ]);

        compute_profits(&mut t, &NullCollaborator);

        assert_eq!(t.get(0, COL_UNIT_PROFIT), Cell::Number(5.0));
        assert_eq!(t.get(0, COL_NET_PROFIT), Cell::Number(10.0));
    }

    #[test]
    fn test_unparseable_cells_count_as_zero() {
        let mut t = matched_table(vec![("A", Cell::text("abc"), Cell::Number(10.0), 4.0)]);

        compute_profits(&mut t, &NullCollaborator);

        assert_eq!(t.get(0, COL_UNIT_PROFIT), Cell::Number(6.0));
        assert_eq!(t.get(0, COL_NET_PROFIT), Cell::Number(0.0));
    }
}
