use std::{
    io::{BufRead, Write},
    path::PathBuf,
    rc::Rc,
    str::FromStr,
};

use anyhow::{bail, Context, Error};
use tracing::{info, warn};

use crate::aggregate::DashboardReport;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::filter::{customer_options, filter_customers, CustomerSelection};
use crate::loader::DatasetCache;
use crate::render::render_dashboard;
use crate::summary::summary_report;
use crate::Result;

/// A line of input in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectAll,
    SelectNone,
    Select(Vec<String>),
    Customers,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word.to_ascii_lowercase().as_str() {
            "all" => Ok(Command::SelectAll),
            "none" => Ok(Command::SelectNone),
            "customers" => Ok(Command::Customers),
            "quit" | "exit" => Ok(Command::Quit),
            "select" => {
                let names: Vec<String> = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                if names.is_empty() {
                    bail!("select needs at least one customer name");
                }
                Ok(Command::Select(names))
            }
            _ => bail!(
                "unknown command {line:?} (try: all, none, select NAME[, NAME...], customers, quit)"
            ),
        }
    }
}

/// One user session: the dataset cache, the current customer selection and
/// where exports go. Every refresh recomputes filter, reports and export.
#[derive(Debug)]
pub struct Dashboard {
    cache: DatasetCache,
    source: PathBuf,
    sheet: Option<String>,
    selection: CustomerSelection,
    output_dir: PathBuf,
}

impl Dashboard {
    pub fn new(config: &Config) -> Self {
        Self {
            cache: DatasetCache::new(),
            source: config.source.clone(),
            sheet: config.sheet.clone(),
            selection: config.selection(),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn selection(&self) -> &CustomerSelection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: CustomerSelection) {
        self.selection = selection;
    }

    pub fn dataset(&mut self) -> Result<Rc<Dataset>> {
        self.cache
            .get_dataset(&self.source, self.sheet.as_deref())
            .with_context(|| format!("failed to load {}", self.source.display()))
    }

    /// Renders every report for the current selection and rewrites the summary
    /// CSV. Returns the path of the written file.
    pub fn refresh<W: Write>(&mut self, out: &mut W) -> Result<PathBuf> {
        let dataset = self.dataset()?;
        let filtered = filter_customers(&dataset, &self.selection);
        info!(rows = filtered.len(), "rendering dashboard");
        let report = DashboardReport::build(&filtered);
        let download = summary_report(&filtered)?;
        render_dashboard(out, &report, Some(&download))?;
        download.write_to_dir(&self.output_dir)
    }

    /// Reads commands from `input` until it ends or `quit` is given,
    /// refreshing after every selection change.
    pub fn run_interactive<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    warn!("{e}");
                    writeln!(out, "{e}")?;
                    continue;
                }
            };
            let selection = match command {
                Command::Quit => break,
                Command::Customers => {
                    let dataset = self.dataset()?;
                    match customer_options(&dataset) {
                        Some(names) => writeln!(out, "Customers: {}", names.join(", "))?,
                        None => writeln!(out, "No customer column in this dataset")?,
                    }
                    continue;
                }
                Command::SelectAll => CustomerSelection::All,
                Command::SelectNone => CustomerSelection::none(),
                Command::Select(names) => CustomerSelection::only(names),
            };
            self.set_selection(selection);
            self.refresh(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::{ffi::OsString, fs, io::Cursor};

    const ORDERS: &str = "\
Customer Name,Order Date,Commission,Tailor Charges,Quantity Collected,Quantity Delivered
Asha,2024-01-10,100,40,2,2
Ravi,2024-04-12,200,50,3,1
Asha,2024-05-02,50,20,1,1
";

    fn dashboard_for(dir: &tempfile::TempDir) -> Dashboard {
        let source = dir.path().join("orders.csv");
        fs::write(&source, ORDERS).unwrap();
        let args: Vec<OsString> = vec![
            "tailoring_dashboard".into(),
            source.into(),
            "--output-dir".into(),
            dir.path().as_os_str().to_os_string(),
        ];
        Dashboard::new(&Config::try_parse_from(args).unwrap())
    }

    #[test]
    fn commands_parse() {
        assert_eq!("all".parse::<Command>().unwrap(), Command::SelectAll);
        assert_eq!(" NONE ".parse::<Command>().unwrap(), Command::SelectNone);
        assert_eq!(
            "select Asha, Ravi ,".parse::<Command>().unwrap(),
            Command::Select(vec!["Asha".to_string(), "Ravi".to_string()])
        );
        assert_eq!(
            "select Mary Ann".parse::<Command>().unwrap(),
            Command::Select(vec!["Mary Ann".to_string()])
        );
        assert!("select".parse::<Command>().is_err());
        assert!("plot".parse::<Command>().is_err());
    }

    #[test]
    fn refresh_renders_and_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut dashboard = dashboard_for(&dir);
        let mut out = Vec::new();
        let path = dashboard.refresh(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Net Earnings (Overall): ₹ 240.00"));
        assert!(out.contains("2024Q2"));
        assert_eq!(path, dir.path().join("tailoring_summary_report.csv"));
        let csv = fs::read_to_string(path).unwrap();
        assert!(csv.starts_with(",Customer Name,Order Date"));
    }

    #[test]
    fn interactive_session_reuses_loaded_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut dashboard = dashboard_for(&dir);
        let first = dashboard.dataset().unwrap();

        let input = Cursor::new("customers\nselect Ravi\nbogus\nnone\nquit\nall\n");
        let mut out = Vec::new();
        dashboard.run_interactive(input, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Customers: Asha, Ravi"));
        assert!(out.contains("Net Earnings (Overall): ₹ 150.00"));
        assert!(out.contains("unknown command"));
        assert!(out.contains("Net Earnings (Overall): ₹ 0.00"));
        // quit stops before the trailing `all`
        assert_eq!(dashboard.selection(), &CustomerSelection::none());
        assert!(Rc::ptr_eq(&first, &dashboard.dataset().unwrap()));

        let csv = fs::read_to_string(dir.path().join("tailoring_summary_report.csv")).unwrap();
        assert!(csv.contains("count,0,0,0,0,0,0,0"));
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args: Vec<OsString> = vec![
            "tailoring_dashboard".into(),
            dir.path().join("absent.xlsx").into(),
        ];
        let config = Config::try_parse_from(args).unwrap();
        let mut dashboard = Dashboard::new(&config);
        let err = dashboard.refresh(&mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }
}
