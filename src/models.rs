//! Core data models for the assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Metric =================
//

/// Canonical financial aggregates, in declared detection order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Cogs,
    GrossMargin,
    Opex,
    Ebitda,
    NetIncome,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Revenue,
        Metric::Cogs,
        Metric::GrossMargin,
        Metric::Opex,
        Metric::Ebitda,
        Metric::NetIncome,
    ];

    /// Canonical column name
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Cogs => "cogs",
            Metric::GrossMargin => "gross_margin",
            Metric::Opex => "opex",
            Metric::Ebitda => "ebitda",
            Metric::NetIncome => "net_income",
        }
    }

    /// Human-facing label used in answers and prompts
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Cogs => "COGS",
            Metric::GrossMargin => "Gross Margin",
            Metric::Opex => "OPEX",
            Metric::Ebitda => "EBITDA",
            Metric::NetIncome => "Net Income",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        let name = name.trim().to_lowercase();
        Metric::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Ratio metrics are stored in [0, 1] and rendered as percentages
    pub fn is_ratio(&self) -> bool {
        matches!(self, Metric::GrossMargin)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Period =================
//

/// Closed set of fiscal periods the store knows about
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PeriodToken {
    #[serde(rename = "Q1_2024")]
    Q1_2024,
    #[serde(rename = "Q2_2024")]
    Q2_2024,
    #[serde(rename = "Q3_2024")]
    Q3_2024,
    #[serde(rename = "Q4_2024")]
    Q4_2024,
    #[serde(rename = "2024")]
    Y2024,
    #[serde(rename = "2023")]
    Y2023,
}

impl PeriodToken {
    /// Period assumed when the query names none
    pub const DEFAULT: PeriodToken = PeriodToken::Y2024;

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodToken::Q1_2024 => "Q1_2024",
            PeriodToken::Q2_2024 => "Q2_2024",
            PeriodToken::Q3_2024 => "Q3_2024",
            PeriodToken::Q4_2024 => "Q4_2024",
            PeriodToken::Y2024 => "2024",
            PeriodToken::Y2023 => "2023",
        }
    }

    /// Quarter marker ("Q1".."Q4") for quarter tokens
    pub fn quarter(&self) -> Option<&'static str> {
        self.as_str().split_once('_').map(|(quarter, _)| quarter)
    }

    pub fn year(&self) -> u16 {
        match self {
            PeriodToken::Y2023 => 2023,
            _ => 2024,
        }
    }

    pub fn is_quarter(&self) -> bool {
        self.quarter().is_some()
    }

    /// "Q4 2024" / "2024"
    pub fn label(&self) -> String {
        match self.quarter() {
            Some(quarter) => format!("{} {}", quarter, self.year()),
            None => self.year().to_string(),
        }
    }
}

impl fmt::Display for PeriodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Classification =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Semantic,
    Documental,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Semantic => "semantic",
            Route::Documental => "documental",
        };
        write!(f, "{}", s)
    }
}

/// Engine behind the semantic route
pub const SEMANTIC_TARGET: &str = "Cube Core";
/// Engine behind the documental route
pub const DOCUMENTAL_TARGET: &str = "Weaviate";

/// Routing decision for a single query; never persisted on its own
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub route: Route,
    pub route_target: String,
    pub metric: Option<Metric>,
    pub period: PeriodToken,
    pub is_financial: bool,
}

impl ClassificationResult {
    /// Builds the only two shapes allowed: semantic with a metric,
    /// documental without one.
    pub fn routed(metric: Option<Metric>, period: PeriodToken) -> Self {
        match metric {
            Some(metric) => Self {
                route: Route::Semantic,
                route_target: SEMANTIC_TARGET.to_string(),
                metric: Some(metric),
                period,
                is_financial: true,
            },
            None => Self {
                route: Route::Documental,
                route_target: DOCUMENTAL_TARGET.to_string(),
                metric: None,
                period,
                is_financial: false,
            },
        }
    }

    /// One-line summary used in the classification trace step
    pub fn summary(&self) -> String {
        format!(
            "Route: {} ({}) | Metric: {} | Period: {}",
            self.route,
            self.route_target,
            self.metric.map(|m| m.as_str()).unwrap_or("none"),
            self.period
        )
    }
}

//
// ================= Lookup =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricValue {
    pub metric: Metric,
    pub period: PeriodToken,
    pub value: f64,
    pub formatted: String,
}

//
// ================= Trace =================
//

/// One closed, timed unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub name: String,
    pub input: String,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: f64,
}

//
// ================= Outcome =================
//

/// Everything produced while answering one message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query: String,
    pub classification: ClassificationResult,
    pub sql: Option<String>,
    pub data: Option<MetricValue>,
    pub explanation: String,
    pub answer: String,
    pub steps: Vec<TraceStep>,
    pub total_duration_ms: f64,
    pub audit_id: Uuid,
}

//
// ================= Audit =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    pub answer: String,
    pub sql: Option<String>,
    pub data: Option<MetricValue>,
}

/// Audit record for a handled query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTrace {
    pub trace_id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub classification: ClassificationResult,
    pub steps: Vec<TraceStep>,
    pub total_duration_ms: f64,
    pub result: TraceResult,
    pub integrity_hash: String,
}

/// Identity of the chat session a message belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parts() {
        assert_eq!(PeriodToken::Q4_2024.quarter(), Some("Q4"));
        assert_eq!(PeriodToken::Q4_2024.year(), 2024);
        assert_eq!(PeriodToken::Y2023.quarter(), None);
        assert_eq!(PeriodToken::Y2023.year(), 2023);
        assert_eq!(PeriodToken::Q3_2024.label(), "Q3 2024");
        assert_eq!(PeriodToken::Y2024.label(), "2024");
    }

    #[test]
    fn test_period_serializes_as_token() {
        let json = serde_json::to_string(&PeriodToken::Y2024).unwrap();
        assert_eq!(json, "\"2024\"");
        let json = serde_json::to_string(&PeriodToken::Q1_2024).unwrap();
        assert_eq!(json, "\"Q1_2024\"");
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::from_name("Gross_Margin"), Some(Metric::GrossMargin));
        assert_eq!(Metric::from_name("headcount"), None);
        assert_eq!(
            serde_json::to_string(&Metric::NetIncome).unwrap(),
            "\"net_income\""
        );
    }

    #[test]
    fn test_routed_invariants() {
        let financial = ClassificationResult::routed(Some(Metric::Opex), PeriodToken::Y2023);
        assert_eq!(financial.route, Route::Semantic);
        assert_eq!(financial.route_target, "Cube Core");
        assert!(financial.is_financial);

        let documental = ClassificationResult::routed(None, PeriodToken::DEFAULT);
        assert_eq!(documental.route, Route::Documental);
        assert_eq!(documental.route_target, "Weaviate");
        assert!(documental.metric.is_none());
        assert!(!documental.is_financial);
    }
}
