use polars::prelude::*;
use tracing::{debug, info};

use crate::data_handling::any_dataset::{AnyDataset, DataSource};
use crate::helper_functions::{column_as_f64, validate_columns};
use crate::models::{Dataset, FigureError, FigureResult, PerformanceRecords};

pub const UNIMODAL_SCORE_COLUMN: &str = "unimodal_best_score";
pub const MULTIMODAL_SCORE_COLUMN: &str = "multimodal_best_score";
pub const EVALUATION_METRIC_COLUMN: &str = "evaluation_metric";
pub const MODALITY_COLUMN: &str = "modalities";

/// Rows are kept when their evaluation metric contains this marker.
pub const AUC_MARKER: &str = "AUC";

/// Review table comparing the best unimodal and multimodal score per study.
pub struct PerformanceDataset {
    pub source: DataSource,
    pub score_columns: [String; 2],
    pub evaluation_column: String,
    pub modality_column: String,
}

impl PerformanceDataset {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            score_columns: [
                UNIMODAL_SCORE_COLUMN.to_string(),
                MULTIMODAL_SCORE_COLUMN.to_string(),
            ],
            evaluation_column: EVALUATION_METRIC_COLUMN.to_string(),
            modality_column: MODALITY_COLUMN.to_string(),
        }
    }
}

impl Dataset for PerformanceDataset {
    type Output = PerformanceRecords;

    fn load(&self) -> FigureResult<DataFrame> {
        AnyDataset {
            source: self.source.clone(),
        }
        .load()
    }

    fn preprocess(&self, df: DataFrame) -> FigureResult<PerformanceRecords> {
        preprocess_performance(
            df,
            [self.score_columns[0].as_str(), self.score_columns[1].as_str()],
            &self.evaluation_column,
            &self.modality_column,
        )
    }
}

/// Drops incomplete rows, keeps AUC evaluations and converts both score
/// columns to numbers. The first score column is the baseline.
pub fn preprocess_performance(
    df: DataFrame,
    score_columns: [&str; 2],
    evaluation_column: &str,
    modality_column: &str,
) -> FigureResult<PerformanceRecords> {
    let [baseline_column, comparison_column] = score_columns;
    validate_columns(
        &df,
        &[baseline_column, comparison_column, evaluation_column, modality_column],
    )?;
    let rows_in = df.height();

    let complete = col(baseline_column)
        .is_not_null()
        .and(col(comparison_column).is_not_null())
        .and(col(evaluation_column).is_not_null())
        .and(col(modality_column).is_not_null());

    let filtered = df
        .lazy()
        .filter(complete)
        .filter(
            col(evaluation_column)
                .cast(DataType::String)
                .str()
                .contains_literal(lit(AUC_MARKER)),
        )
        .collect()?;
    info!(
        "Kept {} of {} rows with a complete {} evaluation",
        filtered.height(),
        rows_in,
        AUC_MARKER
    );

    let baseline = required_values(column_as_f64(&filtered, baseline_column)?, baseline_column)?;
    let comparison =
        required_values(column_as_f64(&filtered, comparison_column)?, comparison_column)?;

    let modality_text = filtered.column(modality_column)?.cast(&DataType::String)?;
    let modalities: Vec<String> = modality_text
        .str()?
        .into_iter()
        .map(|label| label.unwrap_or_default().to_string())
        .collect();
    debug!("Converted {} score pairs", modalities.len());

    PerformanceRecords::new(baseline, comparison, modalities)
}

fn required_values(values: Vec<Option<f64>>, column: &str) -> FigureResult<Vec<f64>> {
    values
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| FigureError::Conversion {
                column: column.to_string(),
                value: "null".to_string(),
            })
        })
        .collect()
}
