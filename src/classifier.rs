//! Query Classifier
//!
//! Decides whether a query names a known financial metric and period:
//! - Semantic: metric found, answered from the metric store (Cube Core)
//! - Documental: no metric, answered by free-form chat (Weaviate route)
//!
//! Matching is first-hit in declared table order, not scored.

use crate::catalog::{PeriodRule, METRIC_KEYWORDS, QUARTER_RULES, YEAR_RULES};
use crate::models::{ClassificationResult, Metric, PeriodToken};
use tracing::debug;

/// Query classifier
pub struct QueryClassifier;

impl QueryClassifier {
    /// Classify a raw query. Total over all strings, including "".
    pub fn classify(query: &str) -> ClassificationResult {
        let text = query.to_lowercase();

        let metric = detect_metric(&text);
        let period = detect_period(&text);

        let result = ClassificationResult::routed(metric, period);

        debug!(
            route = %result.route,
            metric = ?result.metric,
            period = %result.period,
            "Query classified"
        );

        result
    }
}

/// First metric whose first matching phrase occurs anywhere in the text
pub fn detect_metric(text: &str) -> Option<Metric> {
    METRIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(metric, _)| *metric)
}

/// Quarters first, then years, then the current-year default
pub fn detect_period(text: &str) -> PeriodToken {
    first_match(&QUARTER_RULES, text)
        .or_else(|| first_match(&YEAR_RULES, text))
        .unwrap_or(PeriodToken::DEFAULT)
}

fn first_match(rules: &[PeriodRule], text: &str) -> Option<PeriodToken> {
    rules
        .iter()
        .find(|rule| rule.matches(text))
        .map(|rule| rule.token)
}
