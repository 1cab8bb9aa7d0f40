// Utility helpers for parsing and number formatting.
//
// Spreadsheet exports are messy: numbers come back as `"5.0"`, blanks as
// `""` or `"nan"`, booleans as `"TRUE"`/`"Yes"`/`"1"`. Everything is funnelled
// through here so the rest of the code only sees typed values.
use num_format::{Locale, ToFormattedString};

/// Placeholders that mean "no value" in exported sample sheets. Matching is
/// exact and case-sensitive, so `NA` and `n/a` are missing but `Na` or `NONE`
/// are kept as text. This is the same token list pandas uses by default when it
/// reads a sheet.
pub const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trim a cell; blanks and [`MISSING_TOKENS`] become `None`.
pub fn clean_cell(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() || MISSING_TOKENS.contains(&s) {
        return None;
    }
    Some(s.to_string())
}

/// Parse a string-like value into `f64` while being forgiving about
/// thousands separators.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips `","` before parsing.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer cells from a workbook often arrive as whole floats (`"12.0"`).
/// Those are accepted; fractional values are not.
pub fn parse_int_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = parse_f64_safe(Some(s))?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn parse_flag_safe(s: Option<&str>) -> Option<bool> {
    let s = s?.trim().to_ascii_lowercase();
    match s.as_str() {
        "true" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "no" | "n" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

/// Round to `decimals` places from the exact binary value of `v`.
///
/// Scaling first (`(v * 1000.0).round() / 1000.0`) rounds twice: `1.0005`
/// is stored just below the midpoint, but `1.0005 * 1000.0` lands on `1000.5`
/// and rounds up. Formatting with a fixed precision rounds once, so a tie
/// only goes up when the stored value really is at or above it.
pub fn round_to(v: f64, decimals: usize) -> f64 {
    if !v.is_finite() {
        return v;
    }
    format!("{:.*}", decimals, v).parse().unwrap_or(v)
}

pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Dashboard metric with a fixed number of decimals and grouped thousands,
/// e.g. the mean aliquot count (`2.200`) or a percentage (`1,234.5`).
///
/// Uses the same single rounding as [`round_to`], so the printed mean always
/// agrees with the exported one. A value that rounds to zero prints without
/// a sign.
pub fn format_decimal(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let fixed = format!("{:.*}", decimals, v.abs());
    let (whole, frac) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    let Ok(whole) = whole.parse::<u64>() else {
        return fixed;
    };
    let negative = v < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&whole.to_formatted_string(&Locale::en));
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Sample, subject, and aliquot counts with grouped thousands (`9,855`).
pub fn format_count<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render an optional measurement; trailing zeros are trimmed so weights
/// print as `1250` and head circumference as `31.5`.
pub fn format_measure(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}
