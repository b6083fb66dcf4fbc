use std::fmt;

use time::{
    format_description::BorrowedFormatItem, macros::format_description, Date, PrimitiveDateTime,
};
use tracing::debug;

use crate::error::LoadError;

pub const CUSTOMER_NAME: &str = "Customer Name";
pub const ORDER_DATE: &str = "Order Date";
pub const COMMISSION: &str = "Commission";
pub const TAILOR_CHARGES: &str = "Tailor Charges";
pub const QUANTITY_COLLECTED: &str = "Quantity Collected";
pub const QUANTITY_DELIVERED: &str = "Quantity Delivered";
pub const QUARTER: &str = "Quarter";

// Slash dates are read month first. Day first is only reached when the
// leading number cannot be a month.
static DATE_FMTS: &[&[BorrowedFormatItem]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
    format_description!("[day padding:none]/[month padding:none]/[year]"),
    format_description!("[day padding:none]-[month repr:short case_sensitive:false]-[year]"),
    format_description!("[day padding:none] [month repr:short case_sensitive:false] [year]"),
    format_description!("[month repr:short case_sensitive:false] [day padding:none], [year]"),
    format_description!("[month repr:long case_sensitive:false] [day padding:none], [year]"),
];

static DATETIME_FMTS: &[&[BorrowedFormatItem]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

/// Parses the textual date forms found in order sheets.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    DATE_FMTS
        .iter()
        .find_map(|fmt| Date::parse(value, fmt).ok())
        .or_else(|| {
            DATETIME_FMTS
                .iter()
                .find_map(|fmt| PrimitiveDateTime::parse(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// A calendar quarter. Orders chronologically by `(year, number)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    year: i32,
    number: u8,
}

impl Quarter {
    pub fn new(year: i32, number: u8) -> Option<Self> {
        (1..=4).contains(&number).then_some(Self { year, number })
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            number: (date.month() as u8 - 1) / 3 + 1,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(Date),
    Quarter(Quarter),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Display value of a non-missing cell, used as a grouping key.
    pub fn label(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Date(d) => write!(f, "{d}"),
            Cell::Quarter(q) => write!(f, "{q}"),
        }
    }
}

/// An in-memory order table with a schema discovered at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Builds a dataset from raw headers and rows.
    ///
    /// Column names are trimmed, blank rows dropped and short rows padded. When an
    /// `Order Date` column exists its values are parsed into dates and a `Quarter`
    /// column is derived from them.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, LoadError> {
        let mut columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let width = columns.len();
        let mut rows: Vec<Vec<Cell>> = rows
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();

        if let Some(date_index) = columns.iter().position(|c| c == ORDER_DATE) {
            for (i, row) in rows.iter_mut().enumerate() {
                row[date_index] = parse_order_date(&row[date_index], i + 1)?;
            }

            let quarter_index = match columns.iter().position(|c| c == QUARTER) {
                Some(index) => index,
                None => {
                    columns.push(QUARTER.to_string());
                    rows.iter_mut().for_each(|r| r.push(Cell::Empty));
                    width
                }
            };
            for row in rows.iter_mut() {
                row[quarter_index] = match row[date_index] {
                    Cell::Date(d) => Cell::Quarter(Quarter::from_date(d)),
                    _ => Cell::Empty,
                };
            }
        }

        debug!(columns = columns.len(), rows = rows.len(), "built dataset");
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.column_index(n).is_some())
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[index]))
    }

    /// Sum of the numeric cells of a column. Missing and non-numeric cells are skipped.
    pub fn sum(&self, name: &str) -> Option<f64> {
        // + 0. turns the -0.0 of an empty float sum into 0.0
        Some(self.column(name)?.filter_map(Cell::as_f64).sum::<f64>() + 0.)
    }

    /// A new dataset with the same schema holding only the rows `keep` accepts.
    pub fn retain_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&[Cell]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

fn parse_order_date(cell: &Cell, row: usize) -> Result<Cell, LoadError> {
    let parsed = match cell {
        Cell::Empty => return Ok(Cell::Empty),
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date(s),
        _ => None,
    };
    parsed.map(Cell::Date).ok_or_else(|| LoadError::DateParse {
        column: ORDER_DATE.to_string(),
        row,
        value: cell.to_string(),
    })
}
