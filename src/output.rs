use crate::types::SummaryStats;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

const BAR_WIDTH: usize = 40;

/// Export a rendered dashboard table as CSV.
///
/// The header line comes from the table's column names, so a filter that
/// leaves no rows still produces a file with the same columns as the preview.
pub fn write_table_csv<T>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>>
where
    T: Tabled + Serialize,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let headers = T::headers();
    wtr.write_record(headers.iter().map(|h| h.as_bytes()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `summary.json` for the current run, newline-terminated.
pub fn write_summary_json(path: &Path, summary: &SummaryStats) -> Result<(), Box<dyn Error>> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, summary)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn print_heading(title: &str) {
    println!("\n{}", "═".repeat(72));
    println!("  {}", title);
    println!("{}\n", "═".repeat(72));
}

pub fn print_metric(label: &str, value: &str) {
    println!("  {:<32} {}", label, value);
}

/// Markdown preview of the first `max_rows` rows, with a trailing count when
/// the table is longer.
pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    println!("{}", "─".repeat(title.chars().count()));
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows", rows.len() - max_rows);
    }
    println!();
}

/// Horizontal text bar chart scaled to the largest value.
pub fn print_bar_chart(title: &str, entries: &[(String, f64)]) {
    println!("\n{}", title);
    if entries.is_empty() {
        println!("  (no data)\n");
        return;
    }
    let label_width = entries
        .iter()
        .map(|(l, _)| l.chars().count())
        .max()
        .unwrap_or(0)
        .min(32);
    let max = entries.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    for (label, value) in entries {
        let bar_len = bar_length(*value, max);
        let label: String = label.chars().take(label_width).collect();
        println!(
            "  {:<width$} │{} {}",
            label,
            "█".repeat(bar_len),
            crate::util::format_measure(*value),
            width = label_width
        );
    }
    println!();
}

fn bar_length(value: f64, max: f64) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * BAR_WIDTH as f64).round().max(1.0) as usize
}
