use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::aggregate::CategoryTotal;
use super::{DashboardReport, FilteredRows};

const BAR_WIDTH: usize = 40;

pub fn write_json(report: &DashboardReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize dashboard json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn write_text<W: Write>(output: &mut W, report: &DashboardReport) -> Result<()> {
    writeln!(
        output,
        "Dataset: {}\t{} .. {}",
        report.dataset,
        format_bound(report.from),
        format_bound(report.to)
    )?;
    if !report.regions.is_empty() {
        writeln!(output, "Regions: {}", report.regions.join(", "))?;
    }
    if !report.nationalities.is_empty() {
        writeln!(output, "Nationalities: {}", report.nationalities.join(", "))?;
    }
    if let Some(facility_type) = report.facility_type {
        writeln!(output, "Facility type: {}", facility_type.as_str())?;
    }
    writeln!(output, "Rows: {}", report.row_count)?;

    if report.row_count == 0 {
        writeln!(output)?;
        writeln!(output, "No data for the selected filters.")?;
        output.flush()?;
        return Ok(());
    }

    writeln!(output)?;
    writeln!(output, "Metrics")?;
    writeln!(output, "  total\t{}", report.metrics.total)?;
    writeln!(output, "  mean\t{:.1}", report.metrics.mean)?;
    writeln!(output, "  max\t{}", report.metrics.max)?;
    writeln!(output, "  min\t{}", report.metrics.min)?;

    writeln!(output)?;
    writeln!(output, "Time series")?;
    let peak = report.series.iter().map(|point| point.value).max().unwrap_or(0);
    for point in &report.series {
        writeln!(
            output,
            "  {}\t{:>9}\t{:>10}\t{}",
            point.date,
            point.value,
            point.running_total,
            bar(point.value, peak)
        )?;
    }

    if let Some(label) = report.top_label {
        write_categories(output, &format!("Top {label}"), &report.top)?;
    }
    if !report.facility_breakdown.is_empty() {
        write_categories(output, "Facility types", &report.facility_breakdown)?;
    }
    if !report.day_of_month.is_empty() {
        writeln!(output)?;
        writeln!(output, "Day of month")?;
        let peak = report
            .day_of_month
            .iter()
            .map(|entry| entry.total)
            .max()
            .unwrap_or(0);
        for entry in &report.day_of_month {
            writeln!(
                output,
                "  {:>2}\t{:>9}\t{}",
                entry.day,
                entry.total,
                bar(entry.total, peak)
            )?;
        }
    }

    if let Some(rows) = &report.rows {
        writeln!(output)?;
        writeln!(output, "Rows")?;
        write_rows(output, rows)?;
    }

    output.flush()?;
    Ok(())
}

fn write_categories<W: Write>(output: &mut W, title: &str, entries: &[CategoryTotal]) -> Result<()> {
    writeln!(output)?;
    writeln!(output, "{title}")?;
    let width = entries
        .iter()
        .map(|entry| entry.name.chars().count())
        .max()
        .unwrap_or(0);
    let peak = entries.iter().map(|entry| entry.total).max().unwrap_or(0);
    for entry in entries {
        writeln!(
            output,
            "  {:<width$}\t{:>9}\t{}",
            entry.name,
            entry.total,
            bar(entry.total, peak)
        )?;
    }
    Ok(())
}

fn write_rows<W: Write>(output: &mut W, rows: &FilteredRows) -> Result<()> {
    match rows {
        FilteredRows::Nationality(rows) => {
            for row in rows {
                writeln!(
                    output,
                    "  {}\t{}\t{}\t{}",
                    row.reference_date, row.nationality, row.landed, row.source_file
                )?;
            }
        }
        FilteredRows::Reception(rows) => {
            for row in rows {
                writeln!(
                    output,
                    "  {}\t{}\t{}\t{}\t{}",
                    row.reference_date,
                    row.region,
                    row.facility_type.as_str(),
                    row.present,
                    row.source_file
                )?;
            }
        }
        FilteredRows::DailyLandings(rows) => {
            for row in rows {
                writeln!(
                    output,
                    "  {}\t{}\t{}",
                    row.date, row.landed, row.source_file
                )?;
            }
        }
    }
    Ok(())
}

fn format_bound(date: Option<NaiveDate>) -> String {
    date.map(|date| date.to_string())
        .unwrap_or_else(|| "*".to_string())
}

pub fn bar(value: u64, peak: u64) -> String {
    if peak == 0 {
        return String::new();
    }
    let length = (value as f64 / peak as f64 * BAR_WIDTH as f64).round() as usize;
    "#".repeat(length)
}
