use std::{
    collections::HashMap,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    time::SystemTime,
};

use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::Datelike;
use time::Date;
use tracing::{debug, info};

use crate::dataset::{parse_date, Cell, Dataset};
use crate::error::LoadError;

const WORKBOOK_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xla", "xls", "ods"];

/// Serial of 9999-12-31, the last date Excel can hold.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.;

/// Reads a tabular source into a [`Dataset`].
///
/// CSV files are read with the `csv` crate, workbooks with `calamine`. For
/// workbooks `sheet` selects the worksheet; the first one is used when it is `None`.
pub fn load_dataset<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let dataset = if extension == "csv" {
        load_csv(path)?
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        load_workbook(path, sheet)?
    } else {
        return Err(LoadError::UnsupportedFormat(path.to_path_buf()));
    };
    info!(
        source = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded dataset"
    );
    Ok(dataset)
}

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Dataset, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => return Err(LoadError::MissingSheet(name.to_string())),
        None => sheet_names.first().cloned().ok_or(LoadError::NoSheets)?,
    };
    debug!(sheet = %sheet_name, "reading worksheet");
    let range = workbook.worksheet_range(&sheet_name)?;
    dataset_from_range(&range)
}

/// Builds a dataset from a worksheet range whose first row holds the headers.
pub fn dataset_from_range(range: &Range<Data>) -> Result<Dataset, LoadError> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Dataset::default());
    };
    let headers = header_row.iter().map(|h| h.to_string()).collect();
    let rows = rows.map(|r| r.iter().map(cell_from_data).collect()).collect();
    Dataset::new(headers, rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Number(dt.as_f64()),
        Data::DateTime(dt) => date_from_excel(dt)
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_date(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Calendar date of a date-formatted cell, honouring the workbook's 1900 or
/// 1904 date system. Serials outside Excel's range have no date.
fn date_from_excel(dt: &ExcelDateTime) -> Option<Date> {
    if !(0.0..=MAX_EXCEL_SERIAL).contains(&dt.as_f64()) {
        return None;
    }
    let date = dt.as_datetime()?.date();
    Date::from_ordinal_date(date.year(), date.ordinal() as u16).ok()
}

fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(cell_from_field).collect());
    }
    Dataset::new(headers, rows)
}

fn cell_from_field(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return if n.is_nan() { Cell::Empty } else { Cell::Number(n) };
    }
    match trimmed {
        "true" | "True" | "TRUE" => Cell::Bool(true),
        "false" | "False" | "FALSE" => Cell::Bool(false),
        _ => Cell::Text(field.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    path: PathBuf,
    sheet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceStamp {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug)]
struct CachedDataset {
    stamp: SourceStamp,
    dataset: Rc<Dataset>,
}

/// Memoizes loaded datasets by source identity (canonical path and sheet).
///
/// An entry is served until the file's modification time or length changes.
#[derive(Debug, Default)]
pub struct DatasetCache {
    cache: HashMap<SourceKey, CachedDataset>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_dataset<P: AsRef<Path>>(
        &mut self,
        path: P,
        sheet: Option<&str>,
    ) -> Result<Rc<Dataset>, LoadError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let key = SourceKey {
            path: fs::canonicalize(path)?,
            sheet: sheet.map(str::to_string),
        };
        let stamp = SourceStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };
        if let Some(entry) = self.cache.get(&key) {
            if entry.stamp == stamp {
                debug!(source = %path.display(), "dataset cache hit");
                return Ok(Rc::clone(&entry.dataset));
            }
            info!(source = %path.display(), "source changed, reloading");
        }
        let dataset = Rc::new(load_dataset(path, sheet)?);
        self.cache.insert(
            key,
            CachedDataset {
                stamp,
                dataset: Rc::clone(&dataset),
            },
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
