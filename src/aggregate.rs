// Pure aggregation helpers: each takes a slice of rows (the full table or a
// filtered view) and returns the table a chart draws from. Empty input always
// yields an empty result, never an error.
use crate::category::DolCategory;
use crate::types::{
    AliquotStats, CategoricalColumn, CategoryCount, CategoryStackEntry, DolRange, FlagCount,
    HistogramBin, Measure, SampleRow, TrajectorySeries,
};
use crate::util::round_to;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Number of rows per subject, ordered by subject ID.
pub fn samples_per_subject(data: &[SampleRow]) -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    for r in data {
        *map.entry(r.subject_id.clone()).or_insert(0) += 1;
    }
    map
}

pub fn unique_subjects(data: &[SampleRow]) -> usize {
    data.iter()
        .map(|r| r.subject_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Total, mean (3 decimals), min and max of the aliquot column. `None` for an
/// empty table.
pub fn aliquot_stats(data: &[SampleRow]) -> Option<AliquotStats> {
    let min = data.iter().map(|r| r.aliquots).min()?;
    let max = data.iter().map(|r| r.aliquots).max()?;
    let total: u64 = data.iter().map(|r| u64::from(r.aliquots)).sum();
    let mean = round_to(total as f64 / data.len() as f64, 3);
    Some(AliquotStats {
        total,
        mean,
        min,
        max,
    })
}

/// Summed aliquots per subject, largest first.
pub fn aliquots_per_subject(data: &[SampleRow]) -> Vec<(String, u64)> {
    let mut map: HashMap<&str, u64> = HashMap::new();
    for r in data {
        *map.entry(r.subject_id.as_str()).or_default() += u64::from(r.aliquots);
    }
    let mut out: Vec<(String, u64)> = map
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Value counts for a categorical column. Missing cells get their own bucket.
pub fn categorical_breakdown(data: &[SampleRow], column: CategoricalColumn) -> Vec<CategoryCount> {
    let mut map: HashMap<Option<&str>, usize> = HashMap::new();
    for r in data {
        *map.entry(column.value(r)).or_default() += 1;
    }
    let mut out: Vec<CategoryCount> = map
        .into_iter()
        .map(|(value, count)| CategoryCount {
            value: value.map(str::to_string),
            count,
        })
        .collect();
    // Count desc; `Some` sorts before `None` so the missing bucket trails ties.
    out.sort_by(|a, b| {
        b.count.cmp(&a.count).then_with(|| match (&a.value, &b.value) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
    out
}

/// Distinct non-missing DOL values per subject. Subjects whose DOL is always
/// missing are present with a count of 0.
pub fn dol_unique_counts(data: &[SampleRow]) -> BTreeMap<String, usize> {
    let mut sets: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
    for r in data {
        let e = sets.entry(r.subject_id.clone()).or_default();
        if let Some(d) = r.dol {
            e.insert(d);
        }
    }
    sets.into_iter().map(|(k, v)| (k, v.len())).collect()
}

/// How many subjects have strictly more than `n` distinct DOLs.
pub fn subjects_with_more_than(counts: &BTreeMap<String, usize>, n: usize) -> usize {
    counts.values().filter(|c| **c > n).count()
}

pub fn dol_range_per_subject(data: &[SampleRow]) -> Vec<DolRange> {
    let mut map: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for r in data {
        let Some(d) = r.dol else { continue };
        map.entry(r.subject_id.as_str())
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(d);
                *hi = (*hi).max(d);
            })
            .or_insert((d, d));
    }
    map.into_iter()
        .map(|(subject, (min_dol, max_dol))| DolRange {
            subject_id: subject.to_string(),
            min_dol,
            max_dol,
            range: max_dol - min_dol,
        })
        .collect()
}

/// Every (subject, DOL) sample point, in table order.
pub fn dol_points(data: &[SampleRow]) -> Vec<(String, i64)> {
    data.iter()
        .filter_map(|r| r.dol.map(|d| (r.subject_id.clone(), d)))
        .collect()
}

/// Sample counts per (subject, DOL category), ordered by subject total
/// descending, then subject ID, then category key order.
pub fn dol_category_stack(data: &[SampleRow]) -> Vec<CategoryStackEntry> {
    let mut counts: BTreeMap<(&str, DolCategory), usize> = BTreeMap::new();
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for r in data {
        *counts
            .entry((r.subject_id.as_str(), r.dol_category))
            .or_default() += 1;
        *totals.entry(r.subject_id.as_str()).or_default() += 1;
    }
    let mut out: Vec<CategoryStackEntry> = counts
        .into_iter()
        .map(|((subject, category), count)| CategoryStackEntry {
            subject_id: subject.to_string(),
            category,
            count,
            total_per_subject: totals.get(subject).copied().unwrap_or(0),
        })
        .collect();
    // Stable sort keeps the (subject, category) order from the BTreeMap.
    out.sort_by_key(|e| Reverse(e.total_per_subject));
    out
}

pub fn discrepancy_breakdown(data: &[SampleRow]) -> Vec<FlagCount> {
    let mut map: BTreeMap<Option<bool>, usize> = BTreeMap::new();
    for r in data {
        *map.entry(r.discrepancy_flag).or_default() += 1;
    }
    let mut out: Vec<FlagCount> = map
        .into_iter()
        .map(|(flag, count)| FlagCount { flag, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Equal-width histogram of the aliquot column. The first bin starts at the
/// observed minimum and the last bin is closed on the observed maximum.
pub fn aliquot_histogram(data: &[SampleRow], bins: usize) -> Vec<HistogramBin> {
    let Some(stats) = aliquot_stats(data) else {
        return Vec::new();
    };
    let (min, max) = (f64::from(stats.min), f64::from(stats.max));
    if bins == 0 {
        return Vec::new();
    }
    if stats.min == stats.max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: data.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for r in data {
        let idx = ((f64::from(r.aliquots) - min) / width).floor() as usize;
        out[idx.min(bins - 1)].count += 1;
    }
    out
}

/// Per-subject (DOL, value) series for a growth measure, each sorted by DOL.
/// Rows missing either the DOL or the measurement contribute no point.
pub fn growth_trajectories(data: &[SampleRow], measure: Measure) -> Vec<TrajectorySeries> {
    let column = measure.column();
    let mut map: BTreeMap<&str, Vec<(i64, f64)>> = BTreeMap::new();
    for r in data {
        if let (Some(d), Some(v)) = (r.dol, column.value(r)) {
            map.entry(r.subject_id.as_str()).or_default().push((d, v));
        }
    }
    map.into_iter()
        .map(|(subject, mut points)| {
            points.sort_by(|a, b| a.0.cmp(&b.0));
            TrajectorySeries {
                subject_id: subject.to_string(),
                points,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::category::categorize_dol;
    use proptest::prelude::*;

    pub(crate) fn row(subject: &str, dol: Option<i64>, aliquots: u32) -> SampleRow {
        SampleRow {
            subject_id: subject.to_string(),
            dol,
            collection_dol: None,
            aliquots,
            current_weight: None,
            current_height: None,
            current_hc: None,
            type_of_milk: None,
            iron: None,
            hmf: None,
            tpn: None,
            additional_comments: None,
            dol_category: categorize_dol(dol),
            discrepancy_flag: None,
        }
    }

    fn scenario() -> Vec<SampleRow> {
        vec![
            row("A", Some(5), 2),
            row("A", Some(5), 3),
            row("A", Some(20), 1),
            row("B", Some(40), 4),
        ]
    }

    #[test]
    fn two_subject_scenario() {
        let data = scenario();
        let counts = dol_unique_counts(&data);
        assert_eq!(counts.get("A"), Some(&2));
        assert_eq!(counts.get("B"), Some(&1));
        assert_eq!(subjects_with_more_than(&counts, 2), 0);
        assert_eq!(
            dol_range_per_subject(&data),
            vec![
                DolRange { subject_id: "A".into(), min_dol: 5, max_dol: 20, range: 15 },
                DolRange { subject_id: "B".into(), min_dol: 40, max_dol: 40, range: 0 },
            ]
        );
    }

    #[test]
    fn all_missing_dol_subject_is_excluded_from_ranges() {
        let data = vec![row("A", Some(3), 1), row("C", None, 1), row("C", None, 2)];
        let ranges = dol_range_per_subject(&data);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].subject_id, "A");
        assert_eq!(dol_unique_counts(&data).get("C"), Some(&0));
    }

    #[test]
    fn aliquot_stats_and_ordering() {
        let data = scenario();
        let stats = aliquot_stats(&data).unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.mean, 2.5);
        assert_eq!((stats.min, stats.max), (1, 4));
        assert_eq!(
            aliquots_per_subject(&data),
            vec![("A".to_string(), 6), ("B".to_string(), 4)]
        );
        assert!(aliquot_stats(&[]).is_none());
    }

    #[test]
    fn mean_is_rounded_to_three_places() {
        let data = vec![row("A", None, 1), row("A", None, 1), row("B", None, 0)];
        assert_eq!(aliquot_stats(&data).unwrap().mean, 0.667);
    }

    #[test]
    fn mean_just_below_a_tie_rounds_down() {
        // 2001 aliquots over 2000 samples is 1.0005 exactly, which f64 stores
        // slightly below the midpoint.
        let mut data: Vec<SampleRow> = (0..1999).map(|i| row(&format!("S{i}"), None, 1)).collect();
        data.push(row("S1999", None, 2));
        let stats = aliquot_stats(&data).unwrap();
        assert_eq!(stats.total, 2001);
        assert_eq!(stats.mean, 1.0);
    }

    #[test]
    fn breakdown_keeps_missing_bucket() {
        let mut data = scenario();
        data[0].type_of_milk = Some("MBM".into());
        data[1].type_of_milk = Some("MBM".into());
        data[2].type_of_milk = Some("DBM".into());
        let counts = categorical_breakdown(&data, CategoricalColumn::TypeOfMilk);
        assert_eq!(
            counts,
            vec![
                CategoryCount { value: Some("MBM".into()), count: 2 },
                CategoryCount { value: Some("DBM".into()), count: 1 },
                CategoryCount { value: None, count: 1 },
            ]
        );
    }

    #[test]
    fn stack_is_sorted_by_total_then_subject() {
        let data = vec![
            row("B", Some(70), 1),
            row("A", Some(1), 1),
            row("C", Some(1), 1),
            row("C", None, 1),
            row("C", Some(30), 1),
        ];
        let stack = dol_category_stack(&data);
        let order: Vec<(&str, DolCategory)> = stack
            .iter()
            .map(|e| (e.subject_id.as_str(), e.category))
            .collect();
        assert_eq!(
            order,
            vec![
                ("C", DolCategory::EarlySampling),
                ("C", DolCategory::ExtendedNicu),
                ("C", DolCategory::Unknown),
                ("A", DolCategory::EarlySampling),
                ("B", DolCategory::LongTermNicu),
            ]
        );
        assert!(stack.iter().filter(|e| e.subject_id == "C").all(|e| e.total_per_subject == 3));
    }

    #[test]
    fn discrepancy_counts_include_missing() {
        let mut data = scenario();
        data[0].discrepancy_flag = Some(true);
        data[1].discrepancy_flag = Some(false);
        data[2].discrepancy_flag = Some(false);
        let counts = discrepancy_breakdown(&data);
        assert_eq!(counts[0], FlagCount { flag: Some(false), count: 2 });
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 4);
        assert!(counts.iter().any(|c| c.flag.is_none()));
    }

    #[test]
    fn histogram_covers_min_and_max() {
        let data: Vec<SampleRow> = (0..=10).map(|a| row("A", None, a)).collect();
        let bins = aliquot_histogram(&data, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 11);
        assert_eq!(bins[3].count, 3); // 8, 9, 10

        let flat = vec![row("A", None, 3), row("B", None, 3)];
        assert_eq!(
            aliquot_histogram(&flat, 20),
            vec![HistogramBin { lower: 3.0, upper: 3.0, count: 2 }]
        );
        assert!(aliquot_histogram(&[], 20).is_empty());
    }

    #[test]
    fn trajectories_sorted_by_dol() {
        let mut data = vec![row("A", Some(20), 1), row("A", Some(5), 1), row("A", None, 1)];
        data[0].current_weight = Some(1500.0);
        data[1].current_weight = Some(1100.0);
        data[2].current_weight = Some(1900.0);
        let series = growth_trajectories(&data, Measure::Weight);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points, vec![(5, 1100.0), (20, 1500.0)]);
        assert!(growth_trajectories(&data, Measure::Height).is_empty());
    }

    fn arb_rows() -> impl Strategy<Value = Vec<SampleRow>> {
        prop::collection::vec(
            ("[A-E]", prop::option::of(0i64..120), 0u32..12),
            0..60,
        )
        .prop_map(|v| v.into_iter().map(|(s, d, a)| row(&s, d, a)).collect())
    }

    proptest! {
        #[test]
        fn samples_per_subject_sums_to_row_count(data in arb_rows()) {
            let total: usize = samples_per_subject(&data).values().sum();
            prop_assert_eq!(total, data.len());
        }

        #[test]
        fn aliquot_total_matches_column(data in arb_rows()) {
            let sum: u64 = data.iter().map(|r| u64::from(r.aliquots)).sum();
            match aliquot_stats(&data) {
                Some(s) => {
                    prop_assert_eq!(s.total, sum);
                    prop_assert_eq!(s.mean, round_to(sum as f64 / data.len() as f64, 3));
                }
                None => prop_assert!(data.is_empty()),
            }
        }

        #[test]
        fn stack_counts_sum_to_subject_rows(data in arb_rows()) {
            let per_subject = samples_per_subject(&data);
            let mut summed: BTreeMap<String, usize> = BTreeMap::new();
            for e in dol_category_stack(&data) {
                *summed.entry(e.subject_id.clone()).or_default() += e.count;
                prop_assert_eq!(e.total_per_subject, per_subject[&e.subject_id]);
            }
            prop_assert_eq!(summed, per_subject);
        }

        #[test]
        fn histogram_counts_every_row(data in arb_rows()) {
            let total: usize = aliquot_histogram(&data, 20).iter().map(|b| b.count).sum();
            prop_assert_eq!(total, data.len());
        }
    }
}
