use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort loading a dataset. Nothing downstream can run without one.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to read CSV source: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported source format for {0}")]
    UnsupportedFormat(PathBuf),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("missing sheet {0:?}")]
    MissingSheet(String),

    #[error("column {column:?}: value {value:?} in data row {row} is not a valid date")]
    DateParse {
        column: String,
        row: usize,
        value: String,
    },
}
