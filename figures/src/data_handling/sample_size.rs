use polars::prelude::*;
use tracing::info;

use crate::data_handling::any_dataset::{AnyDataset, DataSource};
use crate::helper_functions::{column_as_plain_f64, validate_columns};
use crate::models::{Dataset, FigureError, FigureResult};

pub const SAMPLE_SIZE_COLUMN: &str = "total_data";

/// Review table with the total sample size of every included study.
pub struct SampleSizeDataset {
    pub source: DataSource,
}

impl Dataset for SampleSizeDataset {
    type Output = Vec<f64>;

    fn load(&self) -> FigureResult<DataFrame> {
        AnyDataset {
            source: self.source.clone(),
        }
        .load()
    }

    fn preprocess(&self, df: DataFrame) -> FigureResult<Vec<f64>> {
        preprocess_sample_size(&df)
    }
}

/// Non-null `total_data` values as floats. Cells are plain numbers, so a
/// thousands separator such as `"1,200"` is a conversion error.
pub fn preprocess_sample_size(df: &DataFrame) -> FigureResult<Vec<f64>> {
    validate_columns(df, &[SAMPLE_SIZE_COLUMN])?;

    let values: Vec<f64> = column_as_plain_f64(df, SAMPLE_SIZE_COLUMN)?
        .into_iter()
        .flatten()
        .collect();
    info!(
        "{} of {} rows carry a sample size",
        values.len(),
        df.height()
    );

    if values.is_empty() {
        return Err(FigureError::EmptySeries(SAMPLE_SIZE_COLUMN.to_string()));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn drops_missing_sample_sizes() {
        let df = df![
            "title" => &["a", "b", "c", "d"],
            SAMPLE_SIZE_COLUMN => &[Some(120), None, Some(45), Some(3000)]
        ]
        .unwrap();

        assert_eq!(preprocess_sample_size(&df).unwrap(), vec![120.0, 45.0, 3000.0]);
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df!["n" => &[1, 2]].unwrap();
        match preprocess_sample_size(&df) {
            Err(FigureError::MissingColumns(missing)) => {
                assert_eq!(missing, vec![SAMPLE_SIZE_COLUMN])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn all_null_column_is_empty() {
        let df = df![SAMPLE_SIZE_COLUMN => &[None::<i64>, None]].unwrap();
        assert!(matches!(
            preprocess_sample_size(&df),
            Err(FigureError::EmptySeries(_))
        ));
    }

    #[test]
    fn loads_fixed_csv_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table1.csv");
        std::fs::write(&path, "total_data\n10\n100\n1000\n").unwrap();

        let dataset = SampleSizeDataset {
            source: DataSource::File(path),
        };
        assert_eq!(dataset.load_validated().unwrap(), vec![10.0, 100.0, 1000.0]);
    }

    #[test]
    fn thousands_separators_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table1.csv");
        std::fs::write(&path, "total_data\n\"1,200\"\n450\n\"12,000\"\n").unwrap();

        let dataset = SampleSizeDataset {
            source: DataSource::File(path),
        };
        match dataset.load_validated() {
            Err(FigureError::Conversion { column, value }) => {
                assert_eq!(column, SAMPLE_SIZE_COLUMN);
                assert_eq!(value, "1,200");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
