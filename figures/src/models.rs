use std::path::PathBuf;

use polars::prelude::*;
use thiserror::Error;

/// Everything that can stop a figure pipeline.
#[derive(Debug, Error)]
pub enum FigureError {
    #[error("No CSV files found in {}", .0.display())]
    NoDataSource(PathBuf),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("could not convert '{value}' in column '{column}' to a number")]
    Conversion { column: String, value: String },

    #[error("column '{0}' holds no values after cleaning")]
    EmptySeries(String),

    #[error("value {0} cannot be shown on a logarithmic axis")]
    NonPositiveValue(f64),

    #[error("series are misaligned: {baseline} baseline, {comparison} comparison, {labels} labels")]
    Misaligned {
        baseline: usize,
        comparison: usize,
        labels: usize,
    },

    #[error("invalid diagram layout: {0}")]
    Layout(String),

    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type FigureResult<T> = Result<T, FigureError>;

/// Plotting backends carry their own error types; keep only the message.
pub fn drawing_err<E: std::fmt::Display>(e: E) -> FigureError {
    FigureError::Drawing(e.to_string())
}

/// A tabular source that can be read and then cleaned into the shape a
/// figure needs.
pub trait Dataset {
    type Output;

    fn load(&self) -> FigureResult<DataFrame>;

    fn preprocess(&self, df: DataFrame) -> FigureResult<Self::Output>;

    fn load_validated(&self) -> FigureResult<Self::Output> {
        let df = self.load()?;
        self.preprocess(df)
    }
}

/// Paired AUC scores per study together with the modality label of each row.
///
/// The three vectors always have the same length; index `i` in each refers to
/// the same source row.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecords {
    baseline: Vec<f64>,
    comparison: Vec<f64>,
    modalities: Vec<String>,
}

impl PerformanceRecords {
    pub fn new(
        baseline: Vec<f64>,
        comparison: Vec<f64>,
        modalities: Vec<String>,
    ) -> FigureResult<Self> {
        if baseline.len() != comparison.len() || baseline.len() != modalities.len() {
            return Err(FigureError::Misaligned {
                baseline: baseline.len(),
                comparison: comparison.len(),
                labels: modalities.len(),
            });
        }
        Ok(Self {
            baseline,
            comparison,
            modalities,
        })
    }

    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }

    pub fn comparison(&self) -> &[f64] {
        &self.comparison
    }

    pub fn modalities(&self) -> &[String] {
        &self.modalities
    }

    pub fn len(&self) -> usize {
        self.baseline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty()
    }

    /// `(baseline, comparison, modality)` for each row, in source order.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64, &str)> + '_ {
        self.baseline
            .iter()
            .zip(&self.comparison)
            .zip(&self.modalities)
            .map(|((&b, &c), m)| (b, c, m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_series() {
        let err = PerformanceRecords::new(vec![0.7, 0.8], vec![0.9], vec!["CT".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            FigureError::Misaligned { baseline: 2, comparison: 1, labels: 1 }
        ));
    }

    #[test]
    fn missing_columns_message_lists_every_name() {
        let err = FigureError::MissingColumns(vec!["modalities".into(), "total_data".into()]);
        assert_eq!(err.to_string(), "Missing required columns: modalities, total_data");
    }
}
