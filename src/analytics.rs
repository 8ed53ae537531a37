// 📊 Analytics Query Layer - Read-only queries over the assembled result
// Everything here is tolerant by construction: cells that do not coerce to a
// number are excluded from aggregates, never raised. The ResultTable is
// immutable; each query recomputes from scratch (spreadsheet-scale data).

use crate::assemble::ResultTable;
use crate::normalize::{normalize_text, round2};
use crate::schema::{COL_NET_PROFIT, COL_UNIT_PROFIT};
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

// ============================================================================
// QUERY RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_net_profit: f64,
    pub top_product: String,
    pub top_product_profit: f64,
    pub mean_net_profit: f64,
    pub total_products: usize,
    pub profitable_count: usize,
    pub loss_count: usize,
    pub total_sales_quantity: f64,
}

impl Default for KpiSummary {
    fn default() -> Self {
        KpiSummary {
            total_net_profit: 0.0,
            top_product: "No data".to_string(),
            top_product_profit: 0.0,
            mean_net_profit: 0.0,
            total_products: 0,
            profitable_count: 0,
            loss_count: 0,
            total_sales_quantity: 0.0,
        }
    }
}

/// Net-profit buckets: `loss` below zero, the rest split at the 25th/75th
/// percentile of the non-negative values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitDistribution {
    pub loss: usize,
    pub low: usize,
    pub mid: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetProfitStats {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitProfitStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityStats {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
}

/// Each block is present only when its source column exists in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub net_profit: Option<NetProfitStats>,
    pub unit_profit: Option<UnitProfitStats>,
    pub quantity: Option<QuantityStats>,
}

// ============================================================================
// ANALYTICS
// ============================================================================

/// Stateless query surface over one immutable ResultTable.
pub struct Analytics<'a> {
    table: &'a ResultTable,
    identifier_column: Option<String>,
    quantity_column: Option<String>,
}

impl<'a> Analytics<'a> {
    pub fn new(table: &'a ResultTable) -> Self {
        // trust the assembler's choice when it still names a real column
        let identifier_column = if table.data.has_column(&table.identifier_column) {
            Some(table.identifier_column.clone())
        } else {
            find_identifier_column(&table.data)
        };
        let quantity_column = find_quantity_column(&table.data);
        Analytics {
            table,
            identifier_column,
            quantity_column,
        }
    }

    fn data(&self) -> &RawTable {
        &self.table.data
    }

    /// Coercible values of a column, keeping row indices for projections.
    fn numeric_column(&self, column: &str) -> Vec<(usize, f64)> {
        match self.data().column_index(column) {
            Some(idx) => self
                .data()
                .rows
                .iter()
                .enumerate()
                .filter_map(|(row, cells)| {
                    cells.get(idx).and_then(Cell::as_number).map(|v| (row, v))
                })
                .collect(),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // KPI SUMMARY
    // ------------------------------------------------------------------

    pub fn kpi_summary(&self) -> KpiSummary {
        if self.data().is_empty() || !self.data().has_column(COL_NET_PROFIT) {
            return KpiSummary::default();
        }

        let profits = self.numeric_column(COL_NET_PROFIT);
        let values: Vec<f64> = profits.iter().map(|(_, v)| *v).collect();

        let mut summary = KpiSummary {
            total_products: self.data().len(),
            ..Default::default()
        };

        if !values.is_empty() {
            summary.total_net_profit = round2(values.iter().sum());
            summary.mean_net_profit = round2(values.iter().sum::<f64>() / values.len() as f64);
            summary.profitable_count = values.iter().filter(|v| **v > 0.0).count();
            summary.loss_count = values.iter().filter(|v| **v < 0.0).count();

            if let Some((row, top)) = profits
                .iter()
                .copied()
                .max_by(|a, b| a.1.total_cmp(&b.1))
            {
                summary.top_product_profit = round2(top);
                if let Some(column) = &self.identifier_column {
                    let name = self.data().get(row, column);
                    summary.top_product = if name.is_blank() {
                        "Unknown".to_string()
                    } else {
                        name.as_text()
                    };
                }
            }
        }

        if let Some(column) = &self.quantity_column {
            let quantities = self.numeric_column(column);
            summary.total_sales_quantity =
                quantities.iter().map(|(_, v)| *v).sum::<f64>().round();
        }

        summary
    }

    // ------------------------------------------------------------------
    // TOP-N QUERIES
    // ------------------------------------------------------------------

    /// The n rows with the largest Net Kar, projected to identifier, Net Kar,
    /// Birim Kar and quantity where present. Rows whose Net Kar does not
    /// coerce are excluded.
    pub fn top_by_net_profit(&self, n: usize) -> RawTable {
        self.ranked_projection(COL_NET_PROFIT, n, Ranking::Largest, &self.profit_columns())
    }

    /// The n rows with the smallest Net Kar (worst performers first).
    pub fn bottom_by_net_profit(&self, n: usize) -> RawTable {
        self.ranked_projection(COL_NET_PROFIT, n, Ranking::Smallest, &self.profit_columns())
    }

    /// The n rows with the largest sales quantity.
    pub fn top_by_sales_quantity(&self, n: usize) -> RawTable {
        let quantity = match &self.quantity_column {
            Some(q) => q.clone(),
            None => return RawTable::default(),
        };

        let mut columns = Vec::new();
        if let Some(id) = &self.identifier_column {
            columns.push(id.clone());
        }
        columns.push(quantity.clone());
        for extra in [COL_NET_PROFIT, COL_UNIT_PROFIT] {
            if self.data().has_column(extra) {
                columns.push(extra.to_string());
            }
        }

        self.ranked_projection(&quantity, n, Ranking::Largest, &columns)
    }

    fn profit_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        if let Some(id) = &self.identifier_column {
            columns.push(id.clone());
        }
        columns.push(COL_NET_PROFIT.to_string());
        if self.data().has_column(COL_UNIT_PROFIT) {
            columns.push(COL_UNIT_PROFIT.to_string());
        }
        if let Some(q) = &self.quantity_column {
            columns.push(q.clone());
        }
        columns
    }

    fn ranked_projection(
        &self,
        rank_column: &str,
        n: usize,
        ranking: Ranking,
        columns: &[String],
    ) -> RawTable {
        if !self.data().has_column(rank_column) {
            return RawTable::default();
        }

        let mut ranked = self.numeric_column(rank_column);
        match ranking {
            Ranking::Largest => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
            Ranking::Smallest => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
        }
        ranked.truncate(n);

        let present: Vec<String> = columns
            .iter()
            .filter(|c| self.data().has_column(c))
            .cloned()
            .collect();

        let mut result = RawTable::new(present.clone());
        for (row, _) in ranked {
            let cells = present.iter().map(|c| self.data().get(row, c)).collect();
            result.push_row(cells);
        }
        result
    }

    // ------------------------------------------------------------------
    // DISTRIBUTION
    // ------------------------------------------------------------------

    pub fn profit_distribution(&self) -> ProfitDistribution {
        let values: Vec<f64> = self
            .numeric_column(COL_NET_PROFIT)
            .iter()
            .map(|(_, v)| *v)
            .collect();

        if values.is_empty() {
            return ProfitDistribution::default();
        }

        let loss = values.iter().filter(|v| **v < 0.0).count();

        let mut non_negative: Vec<f64> = values.iter().filter(|v| **v >= 0.0).copied().collect();
        non_negative.sort_by(f64::total_cmp);

        let (q25, q75) = if non_negative.len() > 1 {
            (quantile(&non_negative, 0.25), quantile(&non_negative, 0.75))
        } else {
            (0.0, non_negative.last().copied().unwrap_or(0.0))
        };

        if q25 == q75 {
            // degenerate split: a low/mid/high cut would leave an empty
            // mid bucket, so collapse to two buckets at q75
            let low = non_negative.iter().filter(|v| **v < q75).count();
            let high = non_negative.len() - low;
            return ProfitDistribution {
                loss,
                low,
                mid: 0,
                high,
            };
        }

        ProfitDistribution {
            loss,
            low: non_negative.iter().filter(|v| **v < q25).count(),
            mid: non_negative.iter().filter(|v| **v >= q25 && **v < q75).count(),
            high: non_negative.iter().filter(|v| **v >= q75).count(),
        }
    }

    // ------------------------------------------------------------------
    // SEARCH
    // ------------------------------------------------------------------

    /// Case-insensitive substring match on the identifier column. An empty
    /// term yields an empty result, not every row.
    pub fn search(&self, term: &str) -> RawTable {
        let mut result = RawTable::new(self.data().columns.clone());

        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return result;
        }

        let column = match &self.identifier_column {
            Some(c) => c.clone(),
            None => return result,
        };

        for row in 0..self.data().len() {
            let haystack = self.data().get(row, &column).as_text().to_lowercase();
            if haystack.contains(&needle) {
                result.push_row(self.data().rows[row].clone());
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // SUMMARY STATISTICS
    // ------------------------------------------------------------------

    pub fn summary_stats(&self) -> SummaryStats {
        let mut stats = SummaryStats::default();

        if self.data().has_column(COL_NET_PROFIT) {
            let values: Vec<f64> = self
                .numeric_column(COL_NET_PROFIT)
                .iter()
                .map(|(_, v)| *v)
                .collect();
            if !values.is_empty() {
                stats.net_profit = Some(NetProfitStats {
                    total: values.iter().sum(),
                    mean: mean(&values),
                    median: median(&values),
                    std_dev: sample_std_dev(&values),
                });
            }
        }

        if self.data().has_column(COL_UNIT_PROFIT) {
            let values: Vec<f64> = self
                .numeric_column(COL_UNIT_PROFIT)
                .iter()
                .map(|(_, v)| *v)
                .collect();
            if !values.is_empty() {
                stats.unit_profit = Some(UnitProfitStats {
                    mean: mean(&values),
                    median: median(&values),
                    std_dev: sample_std_dev(&values),
                });
            }
        }

        if let Some(column) = &self.quantity_column {
            let values: Vec<f64> = self
                .numeric_column(column)
                .iter()
                .map(|(_, v)| *v)
                .collect();
            if !values.is_empty() {
                stats.quantity = Some(QuantityStats {
                    total: values.iter().sum(),
                    mean: mean(&values),
                    median: median(&values),
                });
            }
        }

        stats
    }
}

#[derive(Clone, Copy)]
enum Ranking {
    Largest,
    Smallest,
}

// ============================================================================
// COLUMN DISCOVERY
// ============================================================================

/// Identifier column of an assembled table, by folded keyword patterns in
/// likelihood order; the first column is the fallback (the assembler always
/// puts the identifier first).
fn find_identifier_column(data: &RawTable) -> Option<String> {
    const PATTERNS: [&[&str]; 6] = [
        &["stok", "ismi"],
        &["stok", "isim"],
        &["stok", "kodu"],
        &["stok", "kod"],
        &["urun", "adi"],
        &["urun"],
    ];

    for column in &data.columns {
        let folded = normalize_text(column);
        for pattern in PATTERNS {
            if pattern.iter().all(|kw| folded.contains(kw)) {
                return Some(column.clone());
            }
        }
    }

    data.columns.first().cloned()
}

/// Quantity column: exact canonical/alias names first, then a
/// miktar+satış conjunction, then any column mentioning miktar.
fn find_quantity_column(data: &RawTable) -> Option<String> {
    const EXACT: [&str; 4] = ["Satış Miktar", "Satış\nMiktar", "Satis Miktar", "Miktar"];

    for name in EXACT {
        if data.has_column(name) {
            return Some(name.to_string());
        }
    }

    for column in &data.columns {
        let folded = normalize_text(column);
        if folded.contains("miktar") && folded.contains("satis") {
            return Some(column.clone());
        }
    }

    data.columns
        .iter()
        .find(|c| normalize_text(c).contains("miktar"))
        .cloned()
}

// ============================================================================
// NUMERIC HELPERS
// ============================================================================

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Sample standard deviation (ddof = 1); 0 for fewer than two values.
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Linear-interpolation quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn result_table(rows: Vec<(&str, f64, f64, f64)>) -> ResultTable {
        let mut data = RawTable::new(vec![
            "Stok İsmi".to_string(),
            "Satış Miktar".to_string(),
            "Birim Kar".to_string(),
            "Net Kar".to_string(),
        ]);
        for (name, quantity, unit, net) in rows {
            data.push_row(vec![
                Cell::text(name),
                Cell::Number(quantity),
                Cell::Number(unit),
                Cell::Number(net),
            ]);
        }
        ResultTable {
            identifier_column: "Stok İsmi".to_string(),
            data,
        }
    }

    fn sample() -> ResultTable {
        result_table(vec![
            ("Cola Zero", 10.0, 40.0, 400.0),
            ("Diet Cola", 8.0, 5.0, 40.0),
            ("Pepsi", 5.0, -20.0, -100.0),
            ("Su", 50.0, 1.0, 50.0),
        ])
    }

    #[test]
    fn test_kpi_summary() {
        let table = sample();
        let kpi = Analytics::new(&table).kpi_summary();

        assert_eq!(kpi.total_net_profit, 390.0);
        assert_eq!(kpi.top_product, "Cola Zero");
        assert_eq!(kpi.top_product_profit, 400.0);
        assert_eq!(kpi.mean_net_profit, 97.5);
        assert_eq!(kpi.total_products, 4);
        assert_eq!(kpi.profitable_count, 3);
        assert_eq!(kpi.loss_count, 1);
        assert_eq!(kpi.total_sales_quantity, 73.0);
    }

    #[test]
    fn test_kpi_empty_table() {
        let table = ResultTable::default();
        let kpi = Analytics::new(&table).kpi_summary();
        assert_eq!(kpi, KpiSummary::default());
        assert_eq!(kpi.top_product, "No data");
    }

    #[test]
    fn test_kpi_excludes_non_numeric_cells() {
        let mut table = sample();
        table.data.set(1, "Net Kar", Cell::text("n/a"));

        let kpi = Analytics::new(&table).kpi_summary();
        assert_eq!(kpi.total_net_profit, 350.0);
        assert_eq!(kpi.total_products, 4); // count stays, aggregate skips
    }

    #[test]
    fn test_top_by_net_profit() {
        let table = sample();
        let top = Analytics::new(&table).top_by_net_profit(2);

        assert_eq!(top.len(), 2);
        assert_eq!(top.get(0, "Stok İsmi"), Cell::text("Cola Zero"));
        assert_eq!(top.get(1, "Stok İsmi"), Cell::text("Su"));
        assert!(top.has_column("Net Kar"));
        assert!(top.has_column("Birim Kar"));
        assert!(top.has_column("Satış Miktar"));
    }

    #[test]
    fn test_bottom_by_net_profit() {
        let table = sample();
        let bottom = Analytics::new(&table).bottom_by_net_profit(1);

        assert_eq!(bottom.len(), 1);
        assert_eq!(bottom.get(0, "Stok İsmi"), Cell::text("Pepsi"));
    }

    #[test]
    fn test_top_by_sales_quantity() {
        let table = sample();
        let top = Analytics::new(&table).top_by_sales_quantity(2);

        assert_eq!(top.get(0, "Stok İsmi"), Cell::text("Su"));
        assert_eq!(top.get(1, "Stok İsmi"), Cell::text("Cola Zero"));
    }

    #[test]
    fn test_distribution_buckets_with_mixed_profits() {
        let table = result_table(vec![
            ("A", 1.0, 0.0, -5.0),
            ("B", 1.0, 0.0, 0.0),
            ("C", 1.0, 0.0, 10.0),
            ("D", 1.0, 0.0, 20.0),
            ("E", 1.0, 0.0, 30.0),
            ("F", 1.0, 0.0, 100.0),
        ]);

        let dist = Analytics::new(&table).profit_distribution();

        // non-negative values [0,10,20,30,100]: q25=10, q75=30
        assert_eq!(dist.loss, 1);
        assert_eq!(dist.low, 1); // 0
        assert_eq!(dist.mid, 2); // 10, 20
        assert_eq!(dist.high, 2); // 30, 100
        assert_eq!(dist.low + dist.mid + dist.high, 5);
    }

    #[test]
    fn test_distribution_degenerate_collapses_to_two_buckets() {
        let table = result_table(vec![
            ("A", 1.0, 0.0, 10.0),
            ("B", 1.0, 0.0, 10.0),
            ("C", 1.0, 0.0, 10.0),
        ]);

        let dist = Analytics::new(&table).profit_distribution();
        assert_eq!(dist.mid, 0);
        assert_eq!(dist.low, 0);
        assert_eq!(dist.high, 3);
    }

    #[test]
    fn test_search_empty_term_is_empty() {
        let table = sample();
        assert!(Analytics::new(&table).search("").is_empty());
        assert!(Analytics::new(&table).search("   ").is_empty());
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let table = sample();
        let hits = Analytics::new(&table).search("cola");

        let names: Vec<String> = hits
            .column_values("Stok İsmi")
            .iter()
            .map(Cell::as_text)
            .collect();
        assert_eq!(names, vec!["Cola Zero".to_string(), "Diet Cola".to_string()]);
    }

    #[test]
    fn test_summary_stats() {
        let table = sample();
        let stats = Analytics::new(&table).summary_stats();

        let net = stats.net_profit.unwrap();
        assert_eq!(net.total, 390.0);
        assert_eq!(net.median, 45.0);
        assert!(net.std_dev > 0.0);

        let unit = stats.unit_profit.unwrap();
        assert_eq!(unit.mean, 6.5);
        assert_eq!(unit.median, 3.0);
        assert!(unit.std_dev > 0.0);

        let quantity = stats.quantity.unwrap();
        assert_eq!(quantity.total, 73.0);
        assert_eq!(quantity.mean, 18.25);
        assert_eq!(quantity.median, 9.0);
    }

    #[test]
    fn test_summary_stats_single_row() {
        let table = result_table(vec![("Su", 5.0, 2.0, 10.0)]);
        let stats = Analytics::new(&table).summary_stats();

        let unit = stats.unit_profit.unwrap();
        assert_eq!(unit.std_dev, 0.0);
        let quantity = stats.quantity.unwrap();
        assert_eq!(quantity.median, 5.0);
    }

    #[test]
    fn test_summary_stats_omits_missing_columns() {
        let mut data = RawTable::new(vec!["Stok İsmi".to_string()]);
        data.push_row(vec![Cell::text("A")]);
        let table = ResultTable {
            identifier_column: "Stok İsmi".to_string(),
            data,
        };

        let stats = Analytics::new(&table).summary_stats();
        assert!(stats.net_profit.is_none());
        assert!(stats.unit_profit.is_none());
        assert!(stats.quantity.is_none());
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = [0.0, 10.0, 20.0, 30.0, 100.0];
        assert_eq!(quantile(&values, 0.25), 10.0);
        assert_eq!(quantile(&values, 0.75), 30.0);
        assert_eq!(quantile(&values, 0.5), 20.0);
        assert_eq!(quantile(&[5.0, 15.0], 0.25), 7.5);
    }
}
