use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Dashboard pages, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Overview,
    MilkAdditives,
    GrowthTrajectories,
    DolMetrics,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Overview,
        Section::MilkAdditives,
        Section::GrowthTrajectories,
        Section::DolMetrics,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Overview => "Overview",
            Section::MilkAdditives => "Milk & Additives",
            Section::GrowthTrajectories => "Growth Trajectories",
            Section::DolMetrics => "DOL Metrics",
        }
    }

    /// Short name used for `--section` and export file prefixes.
    pub fn slug(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::MilkAdditives => "milk",
            Section::GrowthTrajectories => "growth",
            Section::DolMetrics => "dol",
        }
    }

    /// Menu choices are 1-based.
    pub fn from_menu(choice: &str) -> Option<Self> {
        let n: usize = choice.trim().parse().ok()?;
        Section::ALL.get(n.checked_sub(1)?).copied()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Section::ALL
            .into_iter()
            .find(|sec| sec.slug() == s || sec.title().to_ascii_lowercase() == s)
            .ok_or_else(|| format!("unknown section '{}' (expected overview, milk, growth or dol)", s))
    }
}

/// Everything a render pass needs besides the table itself.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub merge_aliases: bool,
    pub aliquot_range: (Option<f64>, Option<f64>),
    /// `None` selects every eligible subject.
    pub subjects: Option<BTreeSet<String>>,
    pub histogram_bins: usize,
    pub preview_rows: usize,
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_path: PathBuf::from("cleaned_nicu_data.xlsx"),
            merge_aliases: false,
            aliquot_range: (None, None),
            subjects: None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            preview_rows: 10,
            export_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slugs_titles_and_menu() {
        assert_eq!("milk".parse::<Section>(), Ok(Section::MilkAdditives));
        assert_eq!("DOL Metrics".parse::<Section>(), Ok(Section::DolMetrics));
        assert!("charts".parse::<Section>().is_err());
        assert_eq!(Section::from_menu("3"), Some(Section::GrowthTrajectories));
        assert_eq!(Section::from_menu("0"), None);
        assert_eq!(Section::from_menu("5"), None);
    }
}
