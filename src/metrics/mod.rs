//! Metric store
//!
//! Fixed in-memory reference table standing in for the metric warehouse.
//! Loaded once, never mutated, so it is shared across sessions as-is.

pub mod format;

pub use format::{format_currency, format_percentage, format_value};

use crate::models::{Metric, MetricValue, PeriodToken};
use std::collections::HashMap;
use tracing::debug;

/// Period → value for one metric
pub type MetricSeries = HashMap<PeriodToken, f64>;

/// Reference values: (metric, [(period, value)])
const REFERENCE_DATA: &[(Metric, &[(PeriodToken, f64)])] = &[
    (
        Metric::Revenue,
        &[
            (PeriodToken::Q1_2024, 980_000.0),
            (PeriodToken::Q2_2024, 1_050_000.0),
            (PeriodToken::Q3_2024, 1_100_000.0),
            (PeriodToken::Q4_2024, 1_234_567.0),
            (PeriodToken::Y2024, 4_364_567.0),
            (PeriodToken::Y2023, 3_850_000.0),
        ],
    ),
    (
        Metric::Cogs,
        &[
            (PeriodToken::Q1_2024, 380_000.0),
            (PeriodToken::Q2_2024, 400_000.0),
            (PeriodToken::Q3_2024, 420_000.0),
            (PeriodToken::Q4_2024, 450_000.0),
            (PeriodToken::Y2024, 1_650_000.0),
            (PeriodToken::Y2023, 1_520_000.0),
        ],
    ),
    (
        Metric::GrossMargin,
        &[
            (PeriodToken::Q1_2024, 0.612),
            (PeriodToken::Q2_2024, 0.619),
            (PeriodToken::Q3_2024, 0.618),
            (PeriodToken::Q4_2024, 0.635),
            (PeriodToken::Y2024, 0.621),
            (PeriodToken::Y2023, 0.605),
        ],
    ),
    (
        Metric::Opex,
        &[
            (PeriodToken::Q1_2024, 310_000.0),
            (PeriodToken::Q2_2024, 325_000.0),
            (PeriodToken::Q3_2024, 330_000.0),
            (PeriodToken::Q4_2024, 345_000.0),
            (PeriodToken::Y2024, 1_310_000.0),
            (PeriodToken::Y2023, 1_225_000.0),
        ],
    ),
    (
        Metric::Ebitda,
        &[
            (PeriodToken::Q1_2024, 290_000.0),
            (PeriodToken::Q2_2024, 325_000.0),
            (PeriodToken::Q3_2024, 350_000.0),
            (PeriodToken::Q4_2024, 439_567.0),
            (PeriodToken::Y2024, 1_404_567.0),
            (PeriodToken::Y2023, 1_105_000.0),
        ],
    ),
    (
        Metric::NetIncome,
        &[
            (PeriodToken::Q1_2024, 174_000.0),
            (PeriodToken::Q2_2024, 195_000.0),
            (PeriodToken::Q3_2024, 210_000.0),
            (PeriodToken::Q4_2024, 263_740.0),
            (PeriodToken::Y2024, 842_740.0),
            (PeriodToken::Y2023, 663_000.0),
        ],
    ),
];

/// Read-only metric table
#[derive(Debug, Clone)]
pub struct MetricStore {
    series: HashMap<Metric, MetricSeries>,
}

impl MetricStore {
    /// Store loaded with the built-in reference figures
    pub fn reference() -> Self {
        Self::from_series(REFERENCE_DATA.iter().map(|(metric, values)| {
            (*metric, values.iter().copied().collect::<MetricSeries>())
        }))
    }

    pub fn from_series(series: impl IntoIterator<Item = (Metric, MetricSeries)>) -> Self {
        Self {
            series: series.into_iter().collect(),
        }
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.series.contains_key(&metric)
    }

    /// Value and display string for a metric/period.
    ///
    /// `None` when the metric is unset or not in the table. A known metric
    /// with no entry for the period reads as zero.
    pub fn lookup(&self, metric: Option<Metric>, period: PeriodToken) -> Option<MetricValue> {
        let metric = metric?;
        let series = self.series.get(&metric)?;

        let value = series.get(&period).copied().unwrap_or_else(|| {
            debug!(metric = %metric, period = %period, "No data for period, reading as zero");
            0.0
        });

        Some(MetricValue {
            metric,
            period,
            value,
            formatted: format_value(metric, value),
        })
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::reference()
    }
}
