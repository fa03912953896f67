use std::path::PathBuf;

use polars::frame::DataFrame;
use tracing::{debug, error, info};

use crate::helper_functions::{find_first_csv, read_csv};
use crate::models::FigureResult;

/// Where a pipeline reads its table from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A fixed CSV file.
    File(PathBuf),
    /// The first CSV file of a directory, by file name.
    Directory(PathBuf),
}

impl DataSource {
    pub fn resolve(&self) -> FigureResult<PathBuf> {
        match self {
            DataSource::File(path) => Ok(path.clone()),
            DataSource::Directory(dir) => find_first_csv(dir),
        }
    }
}

pub struct AnyDataset {
    pub source: DataSource,
}

impl AnyDataset {
    pub fn load(&self) -> FigureResult<DataFrame> {
        let path = self.source.resolve()?;
        info!("Reading data from {}", path.display());

        let df = match read_csv(&path) {
            Ok(df) => df,
            Err(e) => {
                error!("Failed to read CSV {}: {}", path.display(), e);
                return Err(e);
            }
        };
        debug!("Loaded {} rows, {} columns", df.height(), df.width());

        Ok(df)
    }
}
