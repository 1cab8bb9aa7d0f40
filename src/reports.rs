use crate::aggregate::{
    aliquot_histogram, aliquot_stats, aliquots_per_subject, categorical_breakdown,
    discrepancy_breakdown, dol_category_stack, dol_points, dol_range_per_subject,
    dol_unique_counts, growth_trajectories, samples_per_subject, subjects_with_more_than,
    unique_subjects,
};
use crate::aliases::SubjectAliases;
use crate::config::DashboardConfig;
use crate::filter::{
    clamp_range, column_bounds, filter_by_range, filter_by_subject_list, subjects_with_min_samples,
};
use crate::types::{
    AliquotStats, AliquotTotalRow, BreakdownRow, CategoricalColumn, CategoryCount,
    CategoryStackEntry, CategoryStackRow, DolRange, DolRangeRow, FlagCount, HistogramBin,
    HistogramRow, Measure, NumericColumn, SampleRow, SubjectCountRow, SummaryStats,
    TrajectoryPointRow, TrajectorySeries,
};
use crate::util::{format_decimal, format_measure, percent};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub const COMMENTS_CAVEAT: &str =
    "'Additional Comments' contains inconsistent text formatting in the source dataset.";

#[derive(Debug, Clone, Serialize)]
pub struct OverviewReport {
    pub total_samples: usize,
    pub unique_subjects: usize,
    pub samples_per_subject: BTreeMap<String, usize>,
    pub alias_caveat: String,
    pub aliquot_stats: Option<AliquotStats>,
    /// Slider selection after clamping; `None` when the table is empty.
    pub aliquot_range: Option<(f64, f64)>,
    pub filtered_samples: usize,
    pub histogram: Vec<HistogramBin>,
    pub aliquots_per_subject: Vec<(String, u64)>,
}

pub fn build_overview(data: &[SampleRow], config: &DashboardConfig) -> OverviewReport {
    let bounds = column_bounds(data, NumericColumn::Aliquots);
    let aliquot_range = bounds.map(|(min, max)| {
        let (low, high) = config.aliquot_range;
        clamp_range(low.unwrap_or(min), high.unwrap_or(max), min, max)
    });
    let filtered = match aliquot_range {
        Some((low, high)) => filter_by_range(data, NumericColumn::Aliquots, low, high),
        None => Vec::new(),
    };
    debug!(filtered = filtered.len(), "aliquot slider applied");

    OverviewReport {
        total_samples: data.len(),
        unique_subjects: unique_subjects(data),
        samples_per_subject: samples_per_subject(data),
        alias_caveat: SubjectAliases::known().caveat(),
        aliquot_stats: aliquot_stats(data),
        aliquot_range,
        filtered_samples: filtered.len(),
        histogram: aliquot_histogram(&filtered, config.histogram_bins),
        aliquots_per_subject: aliquots_per_subject(data),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub column: &'static str,
    pub title: &'static str,
    pub total: usize,
    pub counts: Vec<CategoryCount>,
}

impl Breakdown {
    fn of(data: &[SampleRow], column: CategoricalColumn, title: &'static str) -> Self {
        Breakdown {
            column: column.header(),
            title,
            total: data.len(),
            counts: categorical_breakdown(data, column),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MilkReport {
    pub breakdowns: Vec<Breakdown>,
    pub comments: Breakdown,
    pub comments_caveat: &'static str,
}

pub fn build_milk(data: &[SampleRow]) -> MilkReport {
    MilkReport {
        breakdowns: vec![
            Breakdown::of(data, CategoricalColumn::TypeOfMilk, "Type of Milk (MBM vs. DBM)"),
            Breakdown::of(data, CategoricalColumn::Iron, "Iron Supplementation"),
            Breakdown::of(data, CategoricalColumn::Hmf, "Human Milk Fortifier (HMF)"),
            Breakdown::of(data, CategoricalColumn::Tpn, "Total Parenteral Nutrition (TPN)"),
        ],
        comments: Breakdown::of(
            data,
            CategoricalColumn::AdditionalComments,
            "Sample Annotations (Additional Comments)",
        ),
        comments_caveat: COMMENTS_CAVEAT,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub subjects_over_2_dols: usize,
    pub subjects_over_5_dols: usize,
    pub eligible: BTreeSet<String>,
    pub selected: BTreeSet<String>,
    /// Requested subjects that are unknown or have fewer than two DOLs.
    pub ignored: Vec<String>,
    pub trajectories: Vec<(Measure, Vec<TrajectorySeries>)>,
}

pub fn build_growth(data: &[SampleRow], selection: Option<&BTreeSet<String>>) -> GrowthReport {
    let counts = dol_unique_counts(data);
    let eligible = subjects_with_min_samples(data, 1);
    let (selected, ignored) = match selection {
        None => (eligible.clone(), Vec::new()),
        Some(wanted) => {
            let (ok, bad): (Vec<&String>, Vec<&String>) =
                wanted.iter().partition(|s| eligible.contains(*s));
            (ok.into_iter().cloned().collect(), bad.into_iter().cloned().collect())
        }
    };
    if !ignored.is_empty() {
        warn!(subjects = ?ignored, "ignoring selections without a growth trajectory");
    }

    let plotted = filter_by_subject_list(data, &selected);
    let trajectories = Measure::ALL
        .into_iter()
        .map(|m| (m, growth_trajectories(&plotted, m)))
        .collect();

    GrowthReport {
        subjects_over_2_dols: subjects_with_more_than(&counts, 2),
        subjects_over_5_dols: subjects_with_more_than(&counts, 5),
        eligible,
        selected,
        ignored,
        trajectories,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DolReport {
    pub ranges: Vec<DolRange>,
    pub points: Vec<(String, i64)>,
    pub stack: Vec<CategoryStackEntry>,
    pub discrepancy: Vec<FlagCount>,
    /// Observed DOL bounds, and the bounds of the DOL logged at collection.
    /// The latter is `None` for sheets without a "Collection DOL" column.
    pub dol_span: Option<(f64, f64)>,
    pub collection_dol_span: Option<(f64, f64)>,
}

pub fn build_dol(data: &[SampleRow]) -> DolReport {
    DolReport {
        dol_span: column_bounds(data, NumericColumn::Dol),
        collection_dol_span: column_bounds(data, NumericColumn::CollectionDol),
        ranges: dol_range_per_subject(data),
        points: dol_points(data),
        stack: dol_category_stack(data),
        discrepancy: discrepancy_breakdown(data),
    }
}

pub fn generate_summary(data: &[SampleRow], config: &DashboardConfig) -> SummaryStats {
    let counts = dol_unique_counts(data);
    let stats = aliquot_stats(data);
    SummaryStats {
        generated_at: chrono::Utc::now(),
        source: config.data_path.display().to_string(),
        total_samples: data.len(),
        unique_subjects: unique_subjects(data),
        total_aliquots: stats.as_ref().map_or(0, |s| s.total),
        avg_aliquots: stats.map(|s| s.mean),
        subjects_over_2_dols: subjects_with_more_than(&counts, 2),
        subjects_over_5_dols: subjects_with_more_than(&counts, 5),
        aliases_merged: config.merge_aliases,
    }
}

// ---- row conversion for tables / CSV ----

pub fn subject_count_rows(counts: &BTreeMap<String, usize>) -> Vec<SubjectCountRow> {
    counts
        .iter()
        .map(|(subject_id, samples)| SubjectCountRow {
            subject_id: subject_id.clone(),
            samples: *samples,
        })
        .collect()
}

pub fn aliquot_total_rows(totals: &[(String, u64)]) -> Vec<AliquotTotalRow> {
    totals
        .iter()
        .map(|(subject_id, total)| AliquotTotalRow {
            subject_id: subject_id.clone(),
            total_aliquots: *total,
        })
        .collect()
}

pub fn histogram_rows(bins: &[HistogramBin]) -> Vec<HistogramRow> {
    let last = bins.len().saturating_sub(1);
    bins.iter()
        .enumerate()
        .map(|(i, b)| HistogramRow {
            bin: format!(
                "[{}, {}{}",
                format_decimal(b.lower, 1),
                format_decimal(b.upper, 1),
                if i == last { "]" } else { ")" }
            ),
            samples: b.count,
        })
        .collect()
}

pub fn breakdown_rows(b: &Breakdown) -> Vec<BreakdownRow> {
    b.counts
        .iter()
        .map(|c| BreakdownRow {
            value: c.value.clone().unwrap_or_else(|| "Missing".to_string()),
            count: c.count,
            percent: format!("{}%", format_decimal(percent(c.count, b.total), 1)),
        })
        .collect()
}

pub fn trajectory_rows(series: &[TrajectorySeries]) -> Vec<TrajectoryPointRow> {
    series
        .iter()
        .flat_map(|s| {
            s.points.iter().map(move |(dol, v)| TrajectoryPointRow {
                subject_id: s.subject_id.clone(),
                dol: *dol,
                value: format_measure(*v),
            })
        })
        .collect()
}

pub fn dol_range_rows(ranges: &[DolRange], points: &[(String, i64)]) -> Vec<DolRangeRow> {
    let mut by_subject: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for (subject, dol) in points {
        by_subject.entry(subject.as_str()).or_default().push(*dol);
    }
    ranges
        .iter()
        .map(|r| {
            let mut dols = by_subject.remove(r.subject_id.as_str()).unwrap_or_default();
            dols.sort_unstable();
            DolRangeRow {
                subject_id: r.subject_id.clone(),
                min_dol: r.min_dol,
                max_dol: r.max_dol,
                range: r.range,
                sample_dols: dols
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })
        .collect()
}

pub fn category_stack_rows(stack: &[CategoryStackEntry]) -> Vec<CategoryStackRow> {
    stack
        .iter()
        .map(|e| CategoryStackRow {
            subject_id: e.subject_id.clone(),
            category: e.category.to_string(),
            count: e.count,
            total: e.total_per_subject,
        })
        .collect()
}

pub fn discrepancy_rows(counts: &[FlagCount]) -> Vec<BreakdownRow> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    counts
        .iter()
        .map(|c| BreakdownRow {
            value: match c.flag {
                Some(true) => "Discrepancy".to_string(),
                Some(false) => "Consistent".to_string(),
                None => "Missing".to_string(),
            },
            count: c.count,
            percent: format!("{}%", format_decimal(percent(c.count, total), 1)),
        })
        .collect()
}
