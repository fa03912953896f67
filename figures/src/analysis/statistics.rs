use tracing::info;

use crate::models::{FigureError, FigureResult, PerformanceRecords};

/// Deltas below this count as favouring the unimodal model.
pub const FAVOURS_BASELINE_BELOW: f64 = 0.01;
/// Deltas above this count as a large multimodal improvement.
pub const LARGE_IMPROVEMENT_ABOVE: f64 = 0.10;

/// Linearly interpolated quantile of an ascending slice, `p` in `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let pos = (n as f64 - 1.0) * p;
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 < n {
        sorted[idx] * (1.0 - frac) + sorted[idx + 1] * frac
    } else {
        sorted[idx]
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(quantile_sorted(&sorted_copy(values), 0.5))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumberSummary {
    pub minimum: f64,
    pub first_quartile: f64,
    pub median: f64,
    pub third_quartile: f64,
    pub maximum: f64,
}

impl FiveNumberSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted_copy(values);
        Some(Self {
            minimum: sorted[0],
            first_quartile: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            third_quartile: quantile_sorted(&sorted, 0.75),
            maximum: sorted[sorted.len() - 1],
        })
    }

    /// Display label and value, smallest first.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("Minimum", self.minimum),
            ("First Quartile", self.first_quartile),
            ("Median", self.median),
            ("Third Quartile", self.third_quartile),
            ("Maximum", self.maximum),
        ]
    }
}

/// Counts derived from `comparison - baseline` per row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaStats {
    pub total: usize,
    pub favours_baseline: usize,
    pub large_improvement: usize,
    pub median_delta: f64,
}

impl DeltaStats {
    pub fn from_deltas(deltas: &[f64]) -> Option<Self> {
        let median_delta = median(deltas)?;
        Some(Self {
            total: deltas.len(),
            favours_baseline: deltas.iter().filter(|&&d| d < FAVOURS_BASELINE_BELOW).count(),
            large_improvement: deltas.iter().filter(|&&d| d > LARGE_IMPROVEMENT_ABOVE).count(),
            median_delta,
        })
    }

    pub fn compute(records: &PerformanceRecords) -> FigureResult<Self> {
        let deltas = pairwise_deltas(records);
        Self::from_deltas(&deltas)
            .ok_or_else(|| FigureError::EmptySeries("score deltas".to_string()))
    }

    pub fn report(&self) {
        info!(
            total = self.total,
            favours_baseline = self.favours_baseline,
            large_improvement = self.large_improvement,
            median_delta = self.median_delta,
            "Score delta statistics"
        );
        println!("Total number of studies: {}", self.total);
        println!(
            "Studies favoring unimodality (Δ < {}): {}",
            FAVOURS_BASELINE_BELOW, self.favours_baseline
        );
        println!(
            "Studies with Δ > {:.2} (favoring multimodality): {}",
            LARGE_IMPROVEMENT_ABOVE, self.large_improvement
        );
    }
}

pub fn pairwise_deltas(records: &PerformanceRecords) -> Vec<f64> {
    records.rows().map(|(base, comp, _)| comp - base).collect()
}
