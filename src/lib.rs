use anyhow::Error;

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod render;
pub mod summary;

#[cfg(test)]
mod testing;

pub use aggregate::{
    compute_section, CommissionSummary, CustomerRecurrence, DashboardReport, InflowOutflow,
    QuarterlyNetEarnings, Section,
};
pub use config::Config;
pub use dashboard::Dashboard;
pub use dataset::{Cell, Dataset, Quarter};
pub use error::LoadError;
pub use filter::{customer_options, filter_customers, CustomerSelection};
pub use loader::{load_dataset, DatasetCache};
pub use summary::{describe, summary_report, Download};

pub type Result<T> = std::result::Result<T, Error>;
