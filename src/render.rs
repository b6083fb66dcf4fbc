use std::io::Write;

use comfy_table::Table;

use crate::aggregate::{
    Category, CommissionSummary, CustomerRecurrence, DashboardReport, InflowOutflow,
    QuarterlyNetEarnings,
};
use crate::summary::Download;
use crate::Result;

const BAR_WIDTH: usize = 40;

/// Formats an amount as rupees with thousands separators, e.g. `₹ -1,234.50`.
pub fn format_rupees(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0. && fixed != "0.00" { "-" } else { "" };
    format!("₹ {sign}{grouped}.{frac_part}")
}

fn bar(amount: f64, scale: f64) -> String {
    if scale <= 0. {
        return String::new();
    }
    let width = (amount.abs() / scale * BAR_WIDTH as f64).round() as usize;
    "#".repeat(width)
}

fn write_bars<W: Write>(out: &mut W, rows: &[(String, f64)]) -> Result<()> {
    let scale = rows.iter().map(|(_, v)| v.abs()).fold(0., f64::max);
    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    for (label, amount) in rows {
        writeln!(
            out,
            "  {label:<label_width$}  {:>12}  {}",
            amount,
            bar(*amount, scale)
        )?;
    }
    Ok(())
}

fn category_rows(categories: &[Category]) -> Vec<(String, f64)> {
    categories
        .iter()
        .map(|c| (c.label.to_string(), c.amount))
        .collect()
}

pub fn render_commission<W: Write>(out: &mut W, summary: &CommissionSummary) -> Result<()> {
    writeln!(out, "\n=== 1. COMMISSION VS TAILOR CHARGES ===\n")?;
    write_bars(out, &category_rows(&summary.categories()))?;
    writeln!(
        out,
        "\nNet Earnings (Overall): {}",
        format_rupees(summary.net_earnings)
    )?;
    Ok(())
}

pub fn render_quarterly<W: Write>(out: &mut W, quarterly: &QuarterlyNetEarnings) -> Result<()> {
    writeln!(out, "\n=== 2. QOQ NET COMMISSION EARNINGS ===\n")?;
    if quarterly.quarters.is_empty() {
        writeln!(out, "  No data to display")?;
        return Ok(());
    }
    let rows: Vec<(String, f64)> = quarterly
        .quarters
        .iter()
        .map(|q| (q.quarter.to_string(), q.net_earnings))
        .collect();
    write_bars(out, &rows)?;
    Ok(())
}

pub fn render_inflow_outflow<W: Write>(out: &mut W, flow: &InflowOutflow) -> Result<()> {
    writeln!(out, "\n=== 3. INFLOW VS OUTFLOW (CLOTHES) ===\n")?;
    let Some((collected, delivered)) = flow.shares() else {
        writeln!(out, "  No data to display")?;
        return Ok(());
    };
    let [c, d] = flow.categories();
    for (category, share) in [(c, collected), (d, delivered)] {
        writeln!(
            out,
            "  {:<10} {:>8}  {:>5.1}%",
            category.label,
            category.amount,
            share * 100.
        )?;
    }
    Ok(())
}

pub fn render_recurrence<W: Write>(out: &mut W, recurrence: &CustomerRecurrence) -> Result<()> {
    writeln!(out, "\n=== 4. CUSTOMER RECURRENCE ANALYSIS ===\n")?;
    if recurrence.counts.is_empty() {
        writeln!(out, "  No data to display")?;
    } else {
        let rows: Vec<(String, f64)> = recurrence
            .counts
            .iter()
            .map(|c| (c.customer.clone(), c.order_count as f64))
            .collect();
        write_bars(out, &rows)?;
    }

    writeln!(out, "\nRecurring Customers")?;
    let mut recurring = recurrence.recurring().peekable();
    if recurring.peek().is_none() {
        writeln!(out, "  No recurring customers")?;
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Customer Name", "Order Count"]);
    for c in recurring {
        table.add_row(vec![c.customer.clone(), c.order_count.to_string()]);
    }
    writeln!(out, "{table}")?;
    Ok(())
}

/// Renders every computed section. Skipped sections produce no output.
pub fn render_dashboard<W: Write>(
    out: &mut W,
    report: &DashboardReport,
    download: Option<&Download>,
) -> Result<()> {
    if let Some(summary) = &report.commission {
        render_commission(out, summary)?;
    }
    if let Some(quarterly) = &report.quarterly {
        render_quarterly(out, quarterly)?;
    }
    if let Some(flow) = &report.inflow_outflow {
        render_inflow_outflow(out, flow)?;
    }
    if let Some(recurrence) = &report.recurrence {
        render_recurrence(out, recurrence)?;
    }
    if let Some(download) = download {
        writeln!(out, "\n=== DOWNLOAD SUMMARY REPORT ===\n")?;
        writeln!(
            out,
            "  {} ({}, {} bytes)",
            download.file_name,
            download.mime,
            download.data.len()
        )?;
    }
    Ok(())
}
