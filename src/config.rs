use std::path::PathBuf;

use clap::Parser;

use crate::filter::CustomerSelection;

pub const DEFAULT_SOURCE: &str = "Test Sheet for App using Python.xlsx";

/// Reporting dashboard for a tailoring business's order sheet.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Order sheet to read (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv).
    #[arg(default_value = DEFAULT_SOURCE)]
    pub source: PathBuf,

    /// Worksheet to read. Defaults to the first sheet of the workbook.
    #[arg(long)]
    pub sheet: Option<String>,

    /// Only report on this customer. Repeat to select several.
    #[arg(long = "customer", value_name = "NAME")]
    pub customers: Vec<String>,

    /// Select no customers at all.
    #[arg(long, conflicts_with = "customers")]
    pub no_customers: bool,

    /// Directory the summary CSV is written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Keep reading customer selections from stdin after the first render.
    #[arg(long)]
    pub interactive: bool,
}

impl Config {
    pub fn selection(&self) -> CustomerSelection {
        if self.no_customers {
            CustomerSelection::none()
        } else if self.customers.is_empty() {
            CustomerSelection::All
        } else {
            CustomerSelection::only(self.customers.iter().cloned())
        }
    }
}
