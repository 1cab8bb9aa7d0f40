// One render pass per section: recompute the section's aggregates from the
// in-memory table, print them, and optionally export them.
use crate::category::DolCategory;
use crate::config::{DashboardConfig, Section};
use crate::output::{self, preview_table, print_bar_chart, print_heading, print_metric};
use crate::reports::{self, DolReport, GrowthReport, MilkReport, OverviewReport};
use crate::types::SampleRow;
use crate::util::{format_count, format_decimal, percent};
use std::path::Path;
use tracing::{error, info};

pub fn render_section(data: &[SampleRow], section: Section, config: &DashboardConfig) {
    info!(section = section.slug(), rows = data.len(), "rendering section");
    print_heading(&format!("NICU Dashboard · {}", section.title()));
    match section {
        Section::Overview => render_overview(&reports::build_overview(data, config), config),
        Section::MilkAdditives => render_milk(&reports::build_milk(data), config),
        Section::GrowthTrajectories => {
            render_growth(&reports::build_growth(data, config.subjects.as_ref()), config)
        }
        Section::DolMetrics => render_dol(&reports::build_dol(data), config),
    }
    if let Some(dir) = &config.export_dir {
        export(dir, "summary.json", |p| {
            output::write_summary_json(p, &reports::generate_summary(data, config))
        });
    }
}

fn render_overview(r: &OverviewReport, config: &DashboardConfig) {
    println!("About the Samples\n");
    print_metric("Total Samples", &format_count(r.total_samples));
    print_metric("Unique Subjects", &format_count(r.unique_subjects));

    let per_subject: Vec<(String, f64)> = r
        .samples_per_subject
        .iter()
        .map(|(s, n)| (s.clone(), *n as f64))
        .collect();
    print_bar_chart("Samples per Subject", &per_subject);
    println!("{}", r.alias_caveat);
    if config.merge_aliases {
        println!("(Aliased IDs have been merged for this run.)");
    }

    println!("\nAliquots Overview\n");
    match &r.aliquot_stats {
        Some(stats) => {
            print_metric("Total Aliquots Collected", &format_count(stats.total));
            print_metric("Avg Aliquots per Sample", &format_decimal(stats.mean, 3));
        }
        None => println!("  (no samples)"),
    }
    if let Some((low, high)) = r.aliquot_range {
        print_metric(
            "Aliquot filter",
            &format!(
                "{} – {} ({} samples)",
                format_decimal(low, 0),
                format_decimal(high, 0),
                format_count(r.filtered_samples)
            ),
        );
    }

    let hist = reports::histogram_rows(&r.histogram);
    let hist_bars: Vec<(String, f64)> = hist
        .iter()
        .map(|h| (h.bin.clone(), h.samples as f64))
        .collect();
    print_bar_chart("Distribution of Aliquots per Sample", &hist_bars);

    let totals = reports::aliquot_total_rows(&r.aliquots_per_subject);
    preview_table(
        "Total Number of Aliquots per Subject",
        None,
        &totals,
        config.preview_rows,
    );

    if let Some(dir) = &config.export_dir {
        let counts = reports::subject_count_rows(&r.samples_per_subject);
        export(dir, "overview_samples_per_subject.csv", |p| output::write_table_csv(p, &counts));
        export(dir, "overview_aliquot_histogram.csv", |p| output::write_table_csv(p, &hist));
        export(dir, "overview_aliquots_per_subject.csv", |p| output::write_table_csv(p, &totals));
    }
}

fn render_milk(r: &MilkReport, config: &DashboardConfig) {
    println!("Milk Composition");
    for b in r.breakdowns.iter().chain(std::iter::once(&r.comments)) {
        let rows = reports::breakdown_rows(b);
        let bars: Vec<(String, f64)> = rows
            .iter()
            .map(|row| (row.value.clone(), percent(row.count, b.total)))
            .collect();
        print_bar_chart(&format!("{} (% of samples)", b.title), &bars);
        preview_table(b.title, None, &rows, config.preview_rows);
        if let Some(dir) = &config.export_dir {
            let name = format!("milk_{}.csv", slugify(b.column));
            export(dir, &name, |p| output::write_table_csv(p, &rows));
        }
    }
    println!("Note: {}", r.comments_caveat);
}

fn render_growth(r: &GrowthReport, config: &DashboardConfig) {
    println!("Growth Trajectories\n");
    print_metric("Subjects with >2 unique DOLs", &format_count(r.subjects_over_2_dols));
    print_metric("Subjects with >5 unique DOLs", &format_count(r.subjects_over_5_dols));
    print_metric("Eligible subjects (2+ DOLs)", &format_count(r.eligible.len()));
    print_metric("Selected subjects", &format_count(r.selected.len()));
    if !r.ignored.is_empty() {
        println!("  Ignored (unknown or single DOL): {}", r.ignored.join(", "));
    }

    for (measure, series) in &r.trajectories {
        let rows = reports::trajectory_rows(series);
        preview_table(
            &format!("{} Trajectories by Subject (2+ Samples)", measure.title()),
            Some("only subjects with more than one sampled DOL"),
            &rows,
            config.preview_rows,
        );
        if let Some(dir) = &config.export_dir {
            let name = format!("growth_{}.csv", measure.slug());
            export(dir, &name, |p| output::write_table_csv(p, &rows));
        }
    }
}

fn render_dol(r: &DolReport, config: &DashboardConfig) {
    let span = |bounds: Option<(f64, f64)>| match bounds {
        Some((low, high)) => format!("{} – {}", format_decimal(low, 0), format_decimal(high, 0)),
        None => "not recorded".to_string(),
    };
    print_metric("DOL span", &span(r.dol_span));
    print_metric("Collection DOL span", &span(r.collection_dol_span));

    let ranges = reports::dol_range_rows(&r.ranges, &r.points);
    preview_table(
        "Sampling Range and DOL Sample Points per Subject",
        Some("range is max - min DOL; sample DOLs list every sampling day"),
        &ranges,
        config.preview_rows,
    );

    println!("DOL Category Key:");
    for c in DolCategory::ALL {
        println!("  - {}: {}", c.label(), c.span());
    }

    let stack = reports::category_stack_rows(&r.stack);
    preview_table(
        "Samples by DOL Category per Subject",
        Some("sorted by subject total, largest first"),
        &stack,
        config.preview_rows,
    );

    let flags = reports::discrepancy_rows(&r.discrepancy);
    preview_table("DOL Collection Discrepancy", None, &flags, config.preview_rows);

    if let Some(dir) = &config.export_dir {
        export(dir, "dol_ranges.csv", |p| output::write_table_csv(p, &ranges));
        export(dir, "dol_category_stack.csv", |p| output::write_table_csv(p, &stack));
        export(dir, "dol_discrepancy.csv", |p| output::write_table_csv(p, &flags));
    }
}

/// Write one export file; failures are logged and do not stop rendering.
fn export<F>(dir: &Path, name: &str, write: F)
where
    F: FnOnce(&Path) -> Result<(), Box<dyn std::error::Error>>,
{
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!(dir = %dir.display(), error = %e, "cannot create export directory");
        return;
    }
    let path = dir.join(name);
    match write(&path) {
        Ok(()) => info!(file = %path.display(), "exported"),
        Err(e) => error!(file = %path.display(), error = %e, "write error"),
    }
}

fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
