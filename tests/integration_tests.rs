use nicu_dashboard::aggregate::{
    aliquot_stats, dol_range_per_subject, dol_unique_counts, samples_per_subject,
    subjects_with_more_than, unique_subjects,
};
use nicu_dashboard::aliases::SubjectAliases;
use nicu_dashboard::category::DolCategory;
use nicu_dashboard::config::DashboardConfig;
use nicu_dashboard::filter::subjects_with_min_samples;
use nicu_dashboard::loader::{load_dataset, LoadError};
use nicu_dashboard::reports::build_overview;
use std::io::Write;
use std::path::PathBuf;

const HEADER: &str = "Subject ID,Aliquots,Type of Milk,Iron,HMF,TPN,Additional Comments,DOL,Current Weight,Current Height,Current HC,DOL Category,DOL Collection Discrepancy Flag";

fn write_sheet(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("nicu.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "{HEADER}").unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sheet(
        &dir,
        "A,2,MBM,Yes,No,No,,5,1100,38,27,Early Sampling,False\n\
         A,3,MBM,Yes,Yes,No,hemolyzed,5.0,1120,38.2,27.1,Early Sampling,True\n\
         A,1,DBM,No,Yes,No,,20,1400,40,28.5,Acute NICU Phase,False\n\
         B,4,,,,,,40,2100,44,31,Extended NICU Phase,\n\
         NB00406,1,MBM,,,,,,,,,Unknown,\n",
    );

    let (rows, report) = load_dataset(&path).expect("load");
    assert_eq!(report.loaded_rows, 5);
    assert_eq!(report.skipped_rows, 0);
    assert_eq!(rows[3].dol_category, DolCategory::ExtendedNicu);
    assert_eq!(rows[4].dol_category, DolCategory::Unknown);

    let counts = dol_unique_counts(&rows);
    assert_eq!(counts["A"], 2);
    assert_eq!(counts["B"], 1);
    assert_eq!(subjects_with_more_than(&counts, 2), 0);
    assert_eq!(
        subjects_with_min_samples(&rows, 1).into_iter().collect::<Vec<_>>(),
        vec!["A".to_string()]
    );

    let ranges = dol_range_per_subject(&rows);
    assert_eq!(ranges.len(), 2);
    assert_eq!((ranges[0].min_dol, ranges[0].max_dol, ranges[0].range), (5, 20, 15));

    let stats = aliquot_stats(&rows).unwrap();
    assert_eq!(stats.total, 11);
    assert_eq!(stats.mean, 2.2);
    assert_eq!(samples_per_subject(&rows).values().sum::<usize>(), rows.len());

    let overview = build_overview(&rows, &DashboardConfig::default());
    assert_eq!(overview.filtered_samples, rows.len());
}

#[test]
fn test_aliases_stay_unmerged_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sheet(
        &dir,
        "NB00405,1,,,,,,3,,,,,\nNB00406,2,,,,,,9,,,,,\n",
    );
    let (rows, _) = load_dataset(&path).unwrap();
    assert_eq!(unique_subjects(&rows), 2);
    let merged = SubjectAliases::known().merge(&rows);
    assert_eq!(unique_subjects(&merged), 1);
    assert_eq!(subjects_with_min_samples(&merged, 1).len(), 1);
}

#[test]
fn test_missing_column_names_the_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "Subject ID,Aliquots\nA,1\n").unwrap();
    let err = load_dataset(&path).unwrap_err();
    assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Type of Milk"));
    assert!(err.to_string().contains("Type of Milk"));
}
