//! Combination of independent loss channels into a beam lifetime.

use crate::common::constants::SECONDS_PER_HOUR;
use crate::numerics::stable_sum;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossContribution {
    pub label: String,
    /// Loss rate [1/s].
    pub rate: f64,
    /// Share of the total rate, `0.0` when the total is not positive.
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeSummary {
    pub total_rate: f64,
    pub lifetime_seconds: f64,
    pub lifetime_hours: f64,
    pub contributions: Vec<LossContribution>,
}

/// Sums independent loss rates; a non-positive total means an infinite lifetime.
pub fn summarize_loss_rates<S: AsRef<str>>(rates: &[(S, f64)]) -> LifetimeSummary {
    let values: Vec<f64> = rates.iter().map(|(_, rate)| *rate).collect();
    let total_rate = stable_sum(&values);
    let lifetime_seconds = if total_rate > 0.0 {
        1.0 / total_rate
    } else {
        f64::INFINITY
    };

    let contributions = rates
        .iter()
        .map(|(label, rate)| LossContribution {
            label: label.as_ref().to_string(),
            rate: *rate,
            fraction: if total_rate > 0.0 {
                rate / total_rate
            } else {
                0.0
            },
        })
        .collect();

    LifetimeSummary {
        total_rate,
        lifetime_seconds,
        lifetime_hours: lifetime_seconds / SECONDS_PER_HOUR,
        contributions,
    }
}
