//! Keyword and period lookup tables
//!
//! Both tables are ordered slices. Detection is first-match in declared
//! order, so reordering an entry changes classification results.

use crate::models::{Metric, PeriodToken};
use lazy_static::lazy_static;
use regex::Regex;

/// Trigger phrases per metric (lower-case, English + Spanish)
pub const METRIC_KEYWORDS: &[(Metric, &[&str])] = &[
    (
        Metric::Revenue,
        &["revenue", "ingresos", "facturación", "sales"],
    ),
    (
        Metric::Cogs,
        &["cogs", "costo de ventas", "costo de lo vendido", "cost of goods"],
    ),
    (Metric::GrossMargin, &["gross margin", "margen bruto"]),
    (
        Metric::Opex,
        &["opex", "gastos operativos", "gastos de operación", "operating expenses"],
    ),
    (Metric::Ebitda, &["ebitda"]),
    (
        Metric::NetIncome,
        &["net income", "utilidad neta", "ingreso neto", "beneficio neto"],
    ),
];

/// Quarter patterns, scanned before any year
pub const QUARTER_PATTERNS: &[(PeriodToken, &[&str])] = &[
    (
        PeriodToken::Q1_2024,
        &[r"q1.?2024", r"primer.?trimestre.?2024", r"first.?quarter.?2024"],
    ),
    (
        PeriodToken::Q2_2024,
        &[r"q2.?2024", r"segundo.?trimestre.?2024", r"second.?quarter.?2024"],
    ),
    (
        PeriodToken::Q3_2024,
        &[r"q3.?2024", r"tercer.?trimestre.?2024", r"third.?quarter.?2024"],
    ),
    (
        PeriodToken::Q4_2024,
        &[r"q4.?2024", r"cuarto.?trimestre.?2024", r"fourth.?quarter.?2024"],
    ),
];

/// Bare-year patterns, most recent first
pub const YEAR_PATTERNS: &[(PeriodToken, &[&str])] = &[
    (PeriodToken::Y2024, &[r"2024"]),
    (PeriodToken::Y2023, &[r"2023"]),
];

/// A period token with its compiled patterns
pub struct PeriodRule {
    pub token: PeriodToken,
    pub patterns: Vec<Regex>,
}

impl PeriodRule {
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

fn compile(table: &[(PeriodToken, &[&str])]) -> Vec<PeriodRule> {
    table
        .iter()
        .map(|(token, patterns)| PeriodRule {
            token: *token,
            patterns: patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        })
        .collect()
}

lazy_static! {
    /// Compiled once, read concurrently without locking
    pub static ref QUARTER_RULES: Vec<PeriodRule> = compile(QUARTER_PATTERNS);
    pub static ref YEAR_RULES: Vec<PeriodRule> = compile(YEAR_PATTERNS);
}
