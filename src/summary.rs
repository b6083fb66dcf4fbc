//! Descriptive statistics of the filtered dataset and the downloadable CSV built from them.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use time::Date;
use tracing::{debug, info};

use crate::dataset::{Cell, Dataset};
use crate::Result;

pub const REPORT_FILE_NAME: &str = "tailoring_summary_report.csv";
pub const REPORT_MIME: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Count,
    Unique,
    Top,
    Freq,
    Mean,
    Std,
    Min,
    Q25,
    Median,
    Q75,
    Max,
}

impl Statistic {
    pub const ALL: [Statistic; 11] = [
        Statistic::Count,
        Statistic::Unique,
        Statistic::Top,
        Statistic::Freq,
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::Q25,
        Statistic::Median,
        Statistic::Q75,
        Statistic::Max,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Unique => "unique",
            Statistic::Top => "top",
            Statistic::Freq => "freq",
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Min => "min",
            Statistic::Q25 => "25%",
            Statistic::Median => "50%",
            Statistic::Q75 => "75%",
            Statistic::Max => "max",
        }
    }
}

/// Moments and order statistics of a non-empty sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Distribution {
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.len() > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.);
            var.sqrt()
        });
        Some(Self {
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[values.len() - 1],
        })
    }
}

/// Linear interpolation between the closest ranks of sorted `values`.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStats {
    Numeric(Option<Distribution>),
    /// Distribution over Julian day numbers.
    Date(Option<Distribution>),
    Categorical {
        unique: usize,
        /// Most frequent value and its frequency.
        top: Option<(String, usize)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub stats: ColumnStats,
}

impl ColumnSummary {
    /// The field written for `statistic`, or `None` when it does not apply.
    pub fn field(&self, statistic: Statistic) -> Option<String> {
        if statistic == Statistic::Count {
            return Some(self.count.to_string());
        }
        match &self.stats {
            ColumnStats::Categorical { unique, top } => match statistic {
                Statistic::Unique => Some(unique.to_string()),
                Statistic::Top => top.as_ref().map(|(value, _)| value.clone()),
                Statistic::Freq => top.as_ref().map(|(_, freq)| freq.to_string()),
                _ => None,
            },
            ColumnStats::Numeric(dist) => {
                let dist = dist.as_ref()?;
                match statistic {
                    Statistic::Std => dist.std.map(|s| s.to_string()),
                    _ => order_statistic(dist, statistic).map(|v| v.to_string()),
                }
            }
            ColumnStats::Date(dist) => {
                let dist = dist.as_ref()?;
                order_statistic(dist, statistic)
                    .and_then(|day| Date::from_julian_day(day.round() as i32).ok())
                    .map(|d| d.to_string())
            }
        }
    }

    fn applies(&self, statistic: Statistic) -> bool {
        match (&self.stats, statistic) {
            (_, Statistic::Count) => true,
            (ColumnStats::Categorical { .. }, s) => {
                matches!(s, Statistic::Unique | Statistic::Top | Statistic::Freq)
            }
            (ColumnStats::Numeric(_), s) => order_statistic_kind(s) || s == Statistic::Std,
            (ColumnStats::Date(_), s) => order_statistic_kind(s),
        }
    }
}

fn order_statistic_kind(statistic: Statistic) -> bool {
    matches!(
        statistic,
        Statistic::Mean
            | Statistic::Min
            | Statistic::Q25
            | Statistic::Median
            | Statistic::Q75
            | Statistic::Max
    )
}

fn order_statistic(dist: &Distribution, statistic: Statistic) -> Option<f64> {
    match statistic {
        Statistic::Mean => Some(dist.mean),
        Statistic::Min => Some(dist.min),
        Statistic::Q25 => Some(dist.q25),
        Statistic::Median => Some(dist.median),
        Statistic::Q75 => Some(dist.q75),
        Statistic::Max => Some(dist.max),
        _ => None,
    }
}

/// Summarizes every column of `dataset`.
///
/// A column is numeric when all its non-missing cells are numbers, a date
/// column when they are all dates, and categorical otherwise. Mixed columns
/// therefore degrade to categorical instead of failing the export.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let cells: Vec<&Cell> = dataset
                .rows()
                .iter()
                .map(|r| &r[index])
                .filter(|c| !c.is_empty())
                .collect();
            ColumnSummary {
                name: name.clone(),
                count: cells.len(),
                stats: column_stats(&cells),
            }
        })
        .collect()
}

fn column_stats(cells: &[&Cell]) -> ColumnStats {
    if !cells.is_empty() {
        let numbers: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
        if numbers.len() == cells.len() {
            return ColumnStats::Numeric(Distribution::from_values(numbers));
        }
        let days: Vec<f64> = cells
            .iter()
            .filter_map(|c| match c {
                Cell::Date(d) => Some(d.to_julian_day() as f64),
                _ => None,
            })
            .collect();
        if days.len() == cells.len() {
            return ColumnStats::Date(Distribution::from_values(days));
        }
    }

    // (frequency, first occurrence) per display value
    let mut frequencies: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, cell) in cells.iter().enumerate() {
        frequencies
            .entry(cell.to_string())
            .or_insert((0, position))
            .0 += 1;
    }
    let unique = frequencies.len();
    let top = frequencies
        .into_iter()
        .max_by(|(_, (freq_a, first_a)), (_, (freq_b, first_b))| {
            freq_a.cmp(freq_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(value, (freq, _))| (value, freq));
    ColumnStats::Categorical { unique, top }
}

/// Serializes summaries as CSV: a header of column names, then one row per
/// statistic that applies to at least one column.
pub fn summary_csv(summaries: &[ColumnSummary]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(std::iter::once("").chain(summaries.iter().map(|s| s.name.as_str())))?;
    if !summaries.is_empty() {
        for statistic in Statistic::ALL {
            if !summaries.iter().any(|s| s.applies(statistic)) {
                continue;
            }
            let fields = summaries
                .iter()
                .map(|s| s.field(statistic).unwrap_or_default());
            wtr.write_record(std::iter::once(statistic.label().to_string()).chain(fields))?;
        }
    }
    wtr.into_inner()
        .map_err(|e| e.into_error())
        .context("failed to flush summary CSV")
}

/// A named file offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub data: Vec<u8>,
}

impl Download {
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name);
        fs::write(&path, &self.data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = self.data.len(), "wrote summary report");
        Ok(path)
    }
}

/// Builds the downloadable summary report of the (filtered) dataset.
pub fn summary_report(dataset: &Dataset) -> Result<Download> {
    let summaries = describe(dataset);
    debug!(columns = summaries.len(), rows = dataset.len(), "described dataset");
    Ok(Download {
        file_name: REPORT_FILE_NAME,
        mime: REPORT_MIME,
        data: summary_csv(&summaries)?,
    })
}
