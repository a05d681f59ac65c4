//! Normalizers for the loosely-formatted numeric and duration strings the
//! source sites emit ("1,234.5 km", "07:30", "標高 3,776m").

use regex::Regex;
use std::num::ParseIntError;
use std::sync::OnceLock;

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+)").unwrap())
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

/// Extracts the first numeric value from an arbitrary string.
///
/// Thousands-separator commas are stripped first; a decimal-point number wins
/// over a bare integer. Blank or purely textual input yields `None` — absence
/// is an expected outcome, not an error.
pub fn parse_float(input: &str) -> Option<f64> {
    let cleaned = input.replace(',', "");
    let m = decimal_re()
        .find(&cleaned)
        .or_else(|| integer_re().find(&cleaned))?;
    m.as_str().parse().ok()
}

/// Converts `"H:MM"` or a bare minute count into total minutes.
///
/// Empty input counts as zero. Non-numeric input is a caller error — callers
/// must check field presence before converting, matching the optionality of
/// the source fields.
pub fn parse_minutes(input: &str) -> Result<i64, ParseIntError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }
    match input.split_once(':') {
        Some((hours, minutes)) => {
            let h: i64 = hours.trim().parse()?;
            let m: i64 = minutes.trim().parse()?;
            Ok(h * 60 + m)
        }
        None => input.parse(),
    }
}

/// Formats total minutes back into the sites' `H:MM` notation.
pub fn format_minutes(total: i64) -> String {
    format!("{}:{:02}", total / 60, total % 60)
}

/// Parses an altitude label such as `"3,776m"` into whole meters.
///
/// Text after the first `m` is ignored; unparsable input yields 0, matching
/// the lenient sort behavior of the listing filters.
pub fn parse_altitude(input: &str) -> i64 {
    let head = match input.find('m') {
        Some(pos) => &input[..pos],
        None => input,
    };
    parse_float(head).map(|v| v as i64).unwrap_or(0)
}
