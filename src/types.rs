use crate::category::DolCategory;
use serde::Serialize;
use tabled::Tabled;

/// Header names the loader requires, in spreadsheet order.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "Subject ID",
    "Aliquots",
    "Type of Milk",
    "Iron",
    "HMF",
    "TPN",
    "Additional Comments",
    "DOL",
    "Current Weight",
    "Current Height",
    "Current HC",
    "DOL Category",
    "DOL Collection Discrepancy Flag",
];

/// Read when present; older exports do not carry it.
pub const COLLECTION_DOL_COLUMN: &str = "Collection DOL";

/// One spreadsheet row before typing. Blank cells are `None`.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub subject_id: Option<String>,
    pub aliquots: Option<String>,
    pub type_of_milk: Option<String>,
    pub iron: Option<String>,
    pub hmf: Option<String>,
    pub tpn: Option<String>,
    pub additional_comments: Option<String>,
    pub dol: Option<String>,
    pub collection_dol: Option<String>,
    pub current_weight: Option<String>,
    pub current_height: Option<String>,
    pub current_hc: Option<String>,
    pub dol_category: Option<String>,
    pub discrepancy_flag: Option<String>,
}

/// A typed sample record. Immutable once the dataset is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub subject_id: String,
    pub dol: Option<i64>,
    pub collection_dol: Option<i64>,
    pub aliquots: u32,
    pub current_weight: Option<f64>,
    pub current_height: Option<f64>,
    pub current_hc: Option<f64>,
    pub type_of_milk: Option<String>,
    pub iron: Option<String>,
    pub hmf: Option<String>,
    pub tpn: Option<String>,
    pub additional_comments: Option<String>,
    pub dol_category: DolCategory,
    pub discrepancy_flag: Option<bool>,
}

/// Numeric columns a range filter or slider can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Aliquots,
    Dol,
    CollectionDol,
    CurrentWeight,
    CurrentHeight,
    CurrentHc,
}

impl NumericColumn {
    pub fn value(self, row: &SampleRow) -> Option<f64> {
        match self {
            NumericColumn::Aliquots => Some(f64::from(row.aliquots)),
            NumericColumn::Dol => row.dol.map(|d| d as f64),
            NumericColumn::CollectionDol => row.collection_dol.map(|d| d as f64),
            NumericColumn::CurrentWeight => row.current_weight,
            NumericColumn::CurrentHeight => row.current_height,
            NumericColumn::CurrentHc => row.current_hc,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            NumericColumn::Aliquots => "Aliquots",
            NumericColumn::Dol => "DOL",
            NumericColumn::CollectionDol => COLLECTION_DOL_COLUMN,
            NumericColumn::CurrentWeight => "Current Weight",
            NumericColumn::CurrentHeight => "Current Height",
            NumericColumn::CurrentHc => "Current HC",
        }
    }
}

/// Free-text / categorical columns with value-count breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalColumn {
    TypeOfMilk,
    Iron,
    Hmf,
    Tpn,
    AdditionalComments,
}

impl CategoricalColumn {
    pub fn value(self, row: &SampleRow) -> Option<&str> {
        match self {
            CategoricalColumn::TypeOfMilk => row.type_of_milk.as_deref(),
            CategoricalColumn::Iron => row.iron.as_deref(),
            CategoricalColumn::Hmf => row.hmf.as_deref(),
            CategoricalColumn::Tpn => row.tpn.as_deref(),
            CategoricalColumn::AdditionalComments => row.additional_comments.as_deref(),
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            CategoricalColumn::TypeOfMilk => "Type of Milk",
            CategoricalColumn::Iron => "Iron",
            CategoricalColumn::Hmf => "HMF",
            CategoricalColumn::Tpn => "TPN",
            CategoricalColumn::AdditionalComments => "Additional Comments",
        }
    }
}

/// Growth measurements that get a trajectory chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Measure {
    Weight,
    Height,
    HeadCircumference,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Weight, Measure::Height, Measure::HeadCircumference];

    pub fn column(self) -> NumericColumn {
        match self {
            Measure::Weight => NumericColumn::CurrentWeight,
            Measure::Height => NumericColumn::CurrentHeight,
            Measure::HeadCircumference => NumericColumn::CurrentHc,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Measure::Weight => "Weight (g)",
            Measure::Height => "Height (cm)",
            Measure::HeadCircumference => "Head Circumference (cm)",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Measure::Weight => "weight",
            Measure::Height => "height",
            Measure::HeadCircumference => "hc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliquotStats {
    pub total: u64,
    pub mean: f64,
    pub min: u32,
    pub max: u32,
}

/// One value-count bucket; `value == None` is the missing bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub value: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DolRange {
    pub subject_id: String,
    pub min_dol: i64,
    pub max_dol: i64,
    pub range: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStackEntry {
    pub subject_id: String,
    pub category: DolCategory,
    pub count: usize,
    pub total_per_subject: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagCount {
    pub flag: Option<bool>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySeries {
    pub subject_id: String,
    pub points: Vec<(i64, f64)>,
}

// ---- rendered rows (markdown preview + CSV export) ----

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SubjectCountRow {
    #[serde(rename = "Subject ID")]
    #[tabled(rename = "Subject ID")]
    pub subject_id: String,
    #[serde(rename = "Samples")]
    #[tabled(rename = "Samples")]
    pub samples: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AliquotTotalRow {
    #[serde(rename = "Subject ID")]
    #[tabled(rename = "Subject ID")]
    pub subject_id: String,
    #[serde(rename = "Total Aliquots")]
    #[tabled(rename = "Total Aliquots")]
    pub total_aliquots: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HistogramRow {
    #[serde(rename = "Aliquots")]
    #[tabled(rename = "Aliquots")]
    pub bin: String,
    #[serde(rename = "Samples")]
    #[tabled(rename = "Samples")]
    pub samples: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BreakdownRow {
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Sample Count")]
    #[tabled(rename = "Sample Count")]
    pub count: usize,
    #[serde(rename = "Percent")]
    #[tabled(rename = "Percent")]
    pub percent: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrajectoryPointRow {
    #[serde(rename = "Subject ID")]
    #[tabled(rename = "Subject ID")]
    pub subject_id: String,
    #[serde(rename = "DOL")]
    #[tabled(rename = "DOL")]
    pub dol: i64,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DolRangeRow {
    #[serde(rename = "Subject ID")]
    #[tabled(rename = "Subject ID")]
    pub subject_id: String,
    #[serde(rename = "Min DOL")]
    #[tabled(rename = "Min DOL")]
    pub min_dol: i64,
    #[serde(rename = "Max DOL")]
    #[tabled(rename = "Max DOL")]
    pub max_dol: i64,
    #[serde(rename = "Range")]
    #[tabled(rename = "Range")]
    pub range: i64,
    #[serde(rename = "Sample DOLs")]
    #[tabled(rename = "Sample DOLs")]
    pub sample_dols: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryStackRow {
    #[serde(rename = "Subject ID")]
    #[tabled(rename = "Subject ID")]
    pub subject_id: String,
    #[serde(rename = "DOL Category")]
    #[tabled(rename = "DOL Category")]
    pub category: String,
    #[serde(rename = "Sample Count")]
    #[tabled(rename = "Sample Count")]
    pub count: usize,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub total_samples: usize,
    pub unique_subjects: usize,
    pub total_aliquots: u64,
    pub avg_aliquots: Option<f64>,
    pub subjects_over_2_dols: usize,
    pub subjects_over_5_dols: usize,
    pub aliases_merged: bool,
}
