// Cell-level parsing and number formatting helpers.
//
// Everything that has to look at a raw CSV string lives here, so the
// aggregation code only ever sees `Option<f64>` and `Option<String>`.
use num_format::{Locale, ToFormattedString};

/// Cell contents that count as "no value", the same set common CSV
/// tooling treats as NA by default.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s)
}

/// Parse a revenue cell.
///
/// - Surrounding whitespace is ignored.
/// - Plain and exponent notation are accepted (`12.5`, `1e3`).
/// - Thousands separators, currency symbols and text are rejected.
/// - Infinite and NaN results are treated as missing.
pub fn parse_revenue(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if is_missing_token(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize a categorical cell: NA tokens become `None`, anything else is
/// kept verbatim so keys match the input exactly.
pub fn clean_category(s: Option<String>) -> Option<String> {
    s.filter(|v| !is_missing_token(v))
}

pub fn average(sum: f64, count: usize) -> Option<f64> {
    // No mean over zero values.
    (count > 0).then(|| sum / count as f64)
}

/// Fixed-decimal rendering with thousands separators, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|v| v.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    let sign = if n.is_sign_negative() && n != 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
