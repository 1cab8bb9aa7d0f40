use crate::category::{categorize_dol, DolCategory};
use crate::types::{RawRow, SampleRow, COLLECTION_DOL_COLUMN, REQUIRED_COLUMNS};
use crate::util::{clean_cell, parse_f64_safe, parse_flag_safe, parse_int_safe};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot open workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },
    #[error("{} has no worksheets", path.display())]
    NoSheets { path: PathBuf },
    #[error("{} has no header row", path.display())]
    Empty { path: PathBuf },
    #[error("{} is missing required column \"{column}\"", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("unsupported file format \".{extension}\" for {} (expected .csv, .xlsx or .xls)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    /// Rows whose stored "DOL Category" disagreed with the recomputed label.
    pub category_mismatches: usize,
    /// Rows whose discrepancy flag was blank and derived from the two DOLs.
    pub derived_flags: usize,
}

impl LoadReport {
    /// Startup lines describing what the loader did to the sheet.
    pub fn notes(&self) -> Vec<String> {
        use crate::util::format_count;

        let mut notes = vec![format!(
            "Loaded {} samples ({} rows read, {} skipped).",
            format_count(self.loaded_rows),
            format_count(self.total_rows),
            format_count(self.skipped_rows)
        )];
        if self.category_mismatches > 0 {
            notes.push(format!(
                "Note: {} rows had a DOL Category that did not match their DOL; recomputed.",
                format_count(self.category_mismatches)
            ));
        }
        if self.derived_flags > 0 {
            notes.push(format!(
                "Note: {} rows had no DOL Collection Discrepancy Flag; derived from DOL and Collection DOL.",
                format_count(self.derived_flags)
            ));
        }
        notes
    }
}

/// Header row plus string cells, whatever the source format.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Load the sample sheet at `path` (CSV or Excel) into typed rows.
///
/// Schema problems are fatal; individual bad rows are skipped and counted.
pub fn load_dataset(path: &Path) -> Result<(Vec<SampleRow>, LoadReport), LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !path.exists() {
        return Err(LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let table = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xls" => read_workbook(path)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext,
            })
        }
    };
    info!(path = %path.display(), rows = table.rows.len(), "read sample sheet");
    rows_from_table(path, table)
}

fn read_csv(path: &Path) -> Result<RawTable, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}

fn read_workbook(path: &Path) -> Result<RawTable, LoadError> {
    use calamine::{open_workbook_auto, Data, Reader};

    let wb_err = |e: calamine::Error| LoadError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut workbook = open_workbook_auto(path).map_err(wb_err)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::NoSheets {
            path: path.to_path_buf(),
        })?;
    let range = workbook.worksheet_range(&sheet_name).map_err(wb_err)?;
    debug!(sheet = %sheet_name, "using first worksheet");

    let mut all_rows = range.rows().map(|row| {
        row.iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                Data::Float(f) => f.to_string(),
                Data::Int(i) => i.to_string(),
                Data::Bool(b) => b.to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>()
    });

    let headers = all_rows
        .next()
        .ok_or_else(|| LoadError::Empty {
            path: path.to_path_buf(),
        })?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    Ok(RawTable {
        headers,
        rows: all_rows.collect(),
    })
}

/// Positions of each known column in the header row.
struct ColumnMap {
    required: [usize; REQUIRED_COLUMNS.len()],
    collection_dol: Option<usize>,
}

impl ColumnMap {
    fn resolve(path: &Path, headers: &[String]) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })?;
        }
        Ok(ColumnMap {
            required,
            collection_dol: find(COLLECTION_DOL_COLUMN),
        })
    }

    fn raw_row(&self, record: &[String]) -> RawRow {
        let cell = |idx: usize| clean_cell(record.get(idx).map(String::as_str));
        let [subject_id, aliquots, type_of_milk, iron, hmf, tpn, additional_comments, dol, current_weight, current_height, current_hc, dol_category, discrepancy_flag] =
            self.required;
        RawRow {
            subject_id: cell(subject_id),
            aliquots: cell(aliquots),
            type_of_milk: cell(type_of_milk),
            iron: cell(iron),
            hmf: cell(hmf),
            tpn: cell(tpn),
            additional_comments: cell(additional_comments),
            dol: cell(dol),
            collection_dol: self.collection_dol.and_then(cell),
            current_weight: cell(current_weight),
            current_height: cell(current_height),
            current_hc: cell(current_hc),
            dol_category: cell(dol_category),
            discrepancy_flag: cell(discrepancy_flag),
        }
    }
}

/// Validate the header row and type every data row.
pub fn rows_from_table(
    path: &Path,
    table: RawTable,
) -> Result<(Vec<SampleRow>, LoadReport), LoadError> {
    if table.headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    let columns = ColumnMap::resolve(path, &table.headers)?;

    let mut report = LoadReport::default();
    let mut rows = Vec::with_capacity(table.rows.len());
    for (idx, record) in table.rows.iter().enumerate() {
        // Trailing blank lines are common in spreadsheet exports.
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        report.total_rows += 1;
        let raw = columns.raw_row(record);
        // +2: one for the header, one for 1-based numbering.
        match clean_row(raw, idx + 2, &mut report) {
            Some(row) => rows.push(row),
            None => report.skipped_rows += 1,
        }
    }
    report.loaded_rows = rows.len();

    if report.category_mismatches > 0 {
        warn!(
            rows = report.category_mismatches,
            "stored DOL Category disagrees with the DOL value; using the recomputed label"
        );
    }
    info!(
        loaded = report.loaded_rows,
        skipped = report.skipped_rows,
        "dataset ready"
    );
    Ok((rows, report))
}

fn clean_row(row: RawRow, line: usize, report: &mut LoadReport) -> Option<SampleRow> {
    let Some(subject_id) = row.subject_id else {
        warn!(line, "skipping row without Subject ID");
        return None;
    };
    let aliquots = match parse_int_safe(row.aliquots.as_deref()).map(u32::try_from) {
        Some(Ok(v)) => v,
        _ => {
            warn!(line, subject = %subject_id, value = ?row.aliquots, "skipping row with invalid Aliquots");
            return None;
        }
    };

    let dol = parse_int_safe(row.dol.as_deref());
    let collection_dol = parse_int_safe(row.collection_dol.as_deref());
    let dol_category = categorize_dol(dol);
    if let Some(stored) = row.dol_category.as_deref() {
        if DolCategory::from_label(stored) != Some(dol_category) {
            debug!(line, stored, computed = %dol_category, "DOL Category mismatch");
            report.category_mismatches += 1;
        }
    }

    let discrepancy_flag = match parse_flag_safe(row.discrepancy_flag.as_deref()) {
        Some(flag) => Some(flag),
        None => match (dol, collection_dol) {
            (Some(a), Some(b)) => {
                report.derived_flags += 1;
                Some(a != b)
            }
            _ => None,
        },
    };

    Some(SampleRow {
        subject_id,
        dol,
        collection_dol,
        aliquots,
        current_weight: parse_f64_safe(row.current_weight.as_deref()),
        current_height: parse_f64_safe(row.current_height.as_deref()),
        current_hc: parse_f64_safe(row.current_hc.as_deref()),
        type_of_milk: row.type_of_milk,
        iron: row.iron,
        hmf: row.hmf,
        tpn: row.tpn,
        additional_comments: row.additional_comments,
        dol_category,
        discrepancy_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    fn record(cells: [&str; 13]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn types_a_complete_row() {
        let table = RawTable {
            headers: headers(),
            rows: vec![record([
                "NB001", "3", "MBM", "Yes", "No", "", "", "20.0", "1250", "40.5", "29", "Acute NICU Phase", "False",
            ])],
        };
        let (rows, report) = rows_from_table(Path::new("t.csv"), table).unwrap();
        assert_eq!(report.loaded_rows, 1);
        assert_eq!(report.category_mismatches, 0);
        let r = &rows[0];
        assert_eq!(r.subject_id, "NB001");
        assert_eq!(r.aliquots, 3);
        assert_eq!(r.dol, Some(20));
        assert_eq!(r.dol_category, DolCategory::AcuteNicu);
        assert_eq!(r.tpn, None);
        assert_eq!(r.current_weight, Some(1250.0));
        assert_eq!(r.discrepancy_flag, Some(false));
    }

    #[test]
    fn missing_column_is_fatal_and_named() {
        let mut h = headers();
        h.retain(|c| c != "HMF");
        let err = rows_from_table(Path::new("t.csv"), RawTable { headers: h, rows: vec![] })
            .unwrap_err();
        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "HMF"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_rows_are_skipped_and_counted() {
        let table = RawTable {
            headers: headers(),
            rows: vec![
                record(["", "1", "", "", "", "", "", "1", "", "", "", "", ""]),
                record(["NB002", "-1", "", "", "", "", "", "1", "", "", "", "", ""]),
                record(["NB003", "", "", "", "", "", "", "1", "", "", "", "", ""]),
                record(["", "", "", "", "", "", "", "", "", "", "", "", ""]),
                record(["NB004", "2", "", "", "", "", "", "", "", "", "", "Early Sampling", ""]),
            ],
        };
        let (rows, report) = rows_from_table(Path::new("t.csv"), table).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.skipped_rows, 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dol_category, DolCategory::Unknown);
        assert_eq!(report.category_mismatches, 1);
    }

    #[test]
    fn flag_derived_from_collection_dol() {
        let mut h = headers();
        h.push(COLLECTION_DOL_COLUMN.to_string());
        let mut rec = record(["NB005", "1", "", "", "", "", "", "10", "", "", "", "", ""]);
        rec.push("12".to_string());
        let (rows, report) =
            rows_from_table(Path::new("t.csv"), RawTable { headers: h, rows: vec![rec] }).unwrap();
        assert_eq!(rows[0].collection_dol, Some(12));
        assert_eq!(rows[0].discrepancy_flag, Some(true));
        assert_eq!(report.derived_flags, 1);
        let notes = report.notes();
        assert_eq!(notes.len(), 2);
        assert!(notes[1].starts_with("Note: 1 rows had no DOL Collection Discrepancy Flag"));
    }

    #[test]
    fn clean_load_has_a_single_note() {
        let report = LoadReport {
            total_rows: 1200,
            loaded_rows: 1198,
            skipped_rows: 2,
            ..LoadReport::default()
        };
        assert_eq!(
            report.notes(),
            vec!["Loaded 1,198 samples (1,200 rows read, 2 skipped).".to_string()]
        );
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            load_dataset(&path),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }

    fn write_sheet(path: &Path, write_rows: impl FnOnce(&mut rust_xlsxwriter::Worksheet)) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        write_rows(sheet);
        workbook.save(path).unwrap();
    }

    #[test]
    fn workbook_cells_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        write_sheet(&path, |ws| {
            for (col, name) in REQUIRED_COLUMNS.iter().enumerate() {
                ws.write_string(0, col as u16, *name).unwrap();
            }
            // Numbers are stored as floats, the flag as a native boolean.
            ws.write_string(1, 0, "NB001").unwrap();
            ws.write_number(1, 1, 3.0).unwrap();
            ws.write_string(1, 2, "MBM").unwrap();
            ws.write_number(1, 7, 20.0).unwrap();
            ws.write_number(1, 8, 1250.5).unwrap();
            ws.write_string(1, 11, "Acute NICU Phase").unwrap();
            ws.write_boolean(1, 12, true).unwrap();
            // Blank DOL and flag, "NA" placeholder for the milk type.
            ws.write_string(2, 0, "NB002").unwrap();
            ws.write_number(2, 1, 2.0).unwrap();
            ws.write_string(2, 2, "NA").unwrap();
        });

        let (rows, report) = load_dataset(&path).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(report.category_mismatches, 0);

        let first = &rows[0];
        assert_eq!(first.subject_id, "NB001");
        assert_eq!(first.aliquots, 3);
        assert_eq!(first.dol, Some(20));
        assert_eq!(first.dol_category, DolCategory::AcuteNicu);
        assert_eq!(first.type_of_milk.as_deref(), Some("MBM"));
        assert_eq!(first.current_weight, Some(1250.5));
        assert_eq!(first.current_height, None);
        assert_eq!(first.discrepancy_flag, Some(true));

        let second = &rows[1];
        assert_eq!(second.aliquots, 2);
        assert_eq!(second.dol, None);
        assert_eq!(second.dol_category, DolCategory::Unknown);
        assert_eq!(second.type_of_milk, None);
        assert_eq!(second.discrepancy_flag, None);
    }

    #[test]
    fn empty_workbook_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_sheet(&path, |_| {});
        assert!(matches!(load_dataset(&path), Err(LoadError::Empty { .. })));
    }

    #[test]
    fn workbook_without_required_header_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.xlsx");
        write_sheet(&path, |ws| {
            ws.write_string(0, 0, "Subject ID").unwrap();
            ws.write_string(0, 1, "Aliquots").unwrap();
            ws.write_string(1, 0, "NB001").unwrap();
            ws.write_number(1, 1, 1.0).unwrap();
        });
        match load_dataset(&path) {
            Err(LoadError::MissingColumn { column, .. }) => assert_eq!(column, "Type of Milk"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            load_dataset(Path::new("/definitely/not/here.xlsx")),
            Err(LoadError::Io { .. })
        ));
    }
}
