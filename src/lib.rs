// Profitability Reconciliation Engine - Core Library
// Reconciles a sales/profitability report against a discount/price report:
// schema detection, price dictionary, fuzzy-keyed join, profit metrics,
// result assembly and the analytics query layer. Presentation is a caller
// concern; see the Collaborator trait.

pub mod analytics;
pub mod assemble;
pub mod collaborator;
pub mod export;
pub mod matching;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod pricing;
pub mod schema;
pub mod table;

// Re-export commonly used types
pub use analytics::{
    Analytics, KpiSummary, NetProfitStats, ProfitDistribution, QuantityStats, SummaryStats,
    UnitProfitStats,
};
pub use assemble::{assemble, ResultTable};
pub use collaborator::{Collaborator, NullCollaborator, Severity};
pub use export::save_results;
pub use matching::{match_prices, MatchStatistics};
pub use metrics::compute_profits;
pub use normalize::{join_key, normalize_text, parse_numeric, parse_numeric_checked};
pub use pipeline::{analyze, AnalysisError, AnalysisOutcome, AnalysisReport, RunConfig};
pub use pricing::{build_price_dictionary, PriceDictionary};
pub use schema::{
    detect_column, detect_header_row, resolve_alias, ColumnRole, Resolution,
};
pub use table::{load_table, Cell, RawTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
