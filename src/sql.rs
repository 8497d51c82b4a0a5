//! Synthetic SQL generation
//!
//! Produces the canonical query the semantic layer would run for a
//! metric and period. The text is shown in the trace for auditability and
//! is never executed.

use crate::models::{Metric, PeriodToken};

/// Table the semantic layer aggregates over
pub const FACTS_TABLE: &str = "financial_metrics";

/// Column used when no metric is known
const GENERIC_COLUMN: &str = "value";

/// Aggregation applied to a metric column
pub fn aggregation(metric: Metric) -> &'static str {
    match metric {
        Metric::GrossMargin => "AVG",
        Metric::Revenue | Metric::Cogs | Metric::Opex | Metric::Ebitda | Metric::NetIncome => {
            "SUM"
        }
    }
}

/// WHERE clause for a period token
pub fn period_filter(period: PeriodToken) -> String {
    match period.quarter() {
        Some(quarter) => format!("quarter = '{}' AND year = {}", quarter, period.year()),
        None => format!("year = {}", period.year()),
    }
}

/// Deterministic three-line query for a metric and period
pub fn generate_query(metric: Option<Metric>, period: PeriodToken) -> String {
    let (agg, column) = match metric {
        Some(metric) => (aggregation(metric), metric.as_str()),
        None => ("SUM", GENERIC_COLUMN),
    };

    format!(
        "SELECT {agg}({column}) AS {column}\nFROM {FACTS_TABLE}\nWHERE {}",
        period_filter(period)
    )
}
