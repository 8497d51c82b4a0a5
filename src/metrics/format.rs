//! Display formatting for metric values

use crate::models::Metric;

/// `$1,234,567.00`; negative amounts render as `$-1,234.00`
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${}{}.{}", sign, grouped, frac_part)
}

/// Ratio in [0, 1] as a one-decimal percentage: `0.618` → `61.8%`
pub fn format_percentage(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Formatting rule for a metric
pub fn format_value(metric: Metric, value: f64) -> String {
    if metric.is_ratio() {
        format_percentage(value)
    } else {
        format_currency(value)
    }
}
