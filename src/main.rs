use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tailoring_dashboard::{Config, Dashboard, Result};

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::parse();
    let mut dashboard = Dashboard::new(&config);

    let mut out = io::stdout().lock();
    let path = dashboard.refresh(&mut out)?;
    writeln!(
        out,
        "The summary report was written as CSV to file {}",
        path.to_string_lossy()
    )?;

    if config.interactive {
        dashboard.run_interactive(io::stdin().lock(), &mut out)?;
    }

    Ok(())
}
