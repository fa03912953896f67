use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::debug;

use crate::models::{FigureError, FigureResult};

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

pub fn read_csv(file_path: &Path) -> FigureResult<DataFrame> {
    // Scan every row when inferring types so a late "0,87" turns the column
    // into text instead of failing the parse.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// First `*.csv` file of `directory`, ordered by file name.
pub fn find_first_csv(directory: &Path) -> FigureResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(directory)
        .map_err(|_| FigureError::NoDataSource(directory.to_path_buf()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    candidates.sort();
    debug!("{} CSV candidates in {}", candidates.len(), directory.display());

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| FigureError::NoDataSource(directory.to_path_buf()))
}

/// Fails with every absent column, in the order they were requested.
pub fn validate_columns(df: &DataFrame, required: &[&str]) -> FigureResult<()> {
    let present = df.get_column_names();
    let missing: Vec<String> = required
        .iter()
        .filter(|&&name| !present.iter().any(|c| c.as_str() == name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FigureError::MissingColumns(missing))
    }
}

/// Parses a number written with either `.` or `,` as decimal mark.
pub fn parse_decimal(raw: &str, column: &str) -> FigureResult<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| FigureError::Conversion {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Parses a plain number; a `,` anywhere is a conversion failure.
pub fn parse_number(raw: &str, column: &str) -> FigureResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FigureError::Conversion {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Reads `column` as text and converts every non-null cell with
/// [`parse_decimal`]. Nulls stay `None` so row positions are kept.
pub fn column_as_f64(df: &DataFrame, column: &str) -> FigureResult<Vec<Option<f64>>> {
    convert_column(df, column, parse_decimal)
}

/// Like [`column_as_f64`] but with [`parse_number`], so `"1,200"` fails.
pub fn column_as_plain_f64(df: &DataFrame, column: &str) -> FigureResult<Vec<Option<f64>>> {
    convert_column(df, column, parse_number)
}

fn convert_column(
    df: &DataFrame,
    column: &str,
    parse: fn(&str, &str) -> FigureResult<f64>,
) -> FigureResult<Vec<Option<f64>>> {
    let as_text = df.column(column)?.cast(&DataType::String)?;
    as_text
        .str()?
        .into_iter()
        .map(|cell| cell.map(|raw| parse(raw, column)).transpose())
        .collect()
}
