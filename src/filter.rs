//! Listing filters: include/exclude name lists, altitude and date windows,
//! difficulty grades, and route-shape classification.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::models::ActivityRecord;

/// Reads one comma-separated list file into cells. Wrapping quotes are
/// stripped per cell; a missing file is an empty list, not an error.
fn read_list_file(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .flat_map(|line| line.split(','))
        .map(|cell| {
            cell.trim()
                .trim_start_matches('"')
                .trim_end_matches('"')
                .to_string()
        })
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Collects the union of names from `--exclude`/`--include` style values,
/// each of which may itself name several files separated by commas.
pub fn name_set_from_files(values: &[String]) -> BTreeSet<String> {
    let mut result = BTreeSet::new();
    for value in values {
        for file in value.split(',') {
            result.extend(read_list_file(&expand_tilde(Path::new(file.trim()))));
        }
    }
    result
}

/// Prefix matching in either direction, tolerant of the list files carrying
/// summit variants ("雲取山" vs "雲取山（東京都）").
pub fn robust_match(names: &BTreeSet<String>, search: &str) -> bool {
    names
        .iter()
        .any(|name| name.starts_with(search) || search.starts_with(name.as_str()))
}

/// Applies include files (union) then exclude files (robust-matched
/// subtraction) to a set of requested mountain names.
pub fn include_exclude(
    mountains: BTreeSet<String>,
    exclude_files: &[String],
    include_files: &[String],
) -> BTreeSet<String> {
    let excludes = name_set_from_files(exclude_files);
    let mut candidates = mountains;
    candidates.extend(name_set_from_files(include_files));
    candidates
        .into_iter()
        .filter(|name| !robust_match(&excludes, name))
        .collect()
}

/// Whether a listing date falls within the acceptable look-back window.
pub fn within_days(date: NaiveDate, today: NaiveDate, days: i64) -> bool {
    let age = (today - date).num_days();
    (0..days).contains(&age)
}

/// Parses a `"D|C|B|A|S"` grade filter into its accepted set.
pub fn parse_levels(expr: &str) -> BTreeSet<String> {
    expr.split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// An out-and-back route climbs and descends nearly the same amount; a
/// one-way route diverges. "Nearly" is 10% of the smaller leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteShape {
    Piston,
    OneWay,
}

pub fn classify_route(elevation_up: f64, elevation_down: f64) -> RouteShape {
    let threshold = 0.1 * elevation_up.min(elevation_down);
    if (elevation_up - elevation_down).abs() <= threshold {
        RouteShape::Piston
    } else {
        RouteShape::OneWay
    }
}

/// Route-shape acceptance for a record. Requesting both shapes (or neither)
/// accepts everything; a record without both elevation numbers cannot be
/// classified and is rejected when one shape is required.
pub fn route_accepted(record: &ActivityRecord, piston: bool, one_way: bool) -> bool {
    if piston == one_way {
        return true;
    }
    let (Some(up), Some(down)) = (record.elevation_up_m, record.elevation_down_m) else {
        return false;
    };
    match classify_route(up, down) {
        RouteShape::Piston => piston,
        RouteShape::OneWay => one_way,
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") || s == "~" {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return home.join(s.strip_prefix("~/").unwrap_or(""));
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_of(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn robust_match_is_bidirectional_prefix() {
        let names = set_of(&["雲取山", "高尾"]);
        assert!(robust_match(&names, "雲取山（東京都）"));
        assert!(robust_match(&names, "雲取"));
        assert!(robust_match(&names, "高尾山"));
        assert!(!robust_match(&names, "富士山"));
    }

    #[test]
    fn include_exclude_from_files() {
        let tmp = TempDir::new().unwrap();
        let include = tmp.path().join("climb.lst");
        let exclude = tmp.path().join("done.lst");
        std::fs::write(&include, "大菩薩嶺,\"金峰山\"\n").unwrap();
        std::fs::write(&exclude, "雲取山\n").unwrap();

        let requested = set_of(&["雲取山", "富士山"]);
        let result = include_exclude(
            requested,
            &[exclude.to_string_lossy().to_string()],
            &[include.to_string_lossy().to_string()],
        );

        assert_eq!(result, set_of(&["富士山", "大菩薩嶺", "金峰山"]));
    }

    #[test]
    fn missing_list_file_is_empty() {
        assert!(name_set_from_files(&["/no/such/file.lst".to_string()]).is_empty());
    }

    #[test]
    fn date_window() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
        let recent = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();
        let old = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert!(within_days(recent, today, 7));
        assert!(!within_days(old, today, 7));
        assert!(!within_days(recent, today, 5));
    }

    #[test]
    fn level_spec_parsing() {
        let levels = parse_levels("D|C|B|A|S");
        assert_eq!(levels.len(), 5);
        assert!(levels.contains("C"));
        let narrow = parse_levels("A|S");
        assert!(!narrow.contains("C"));
    }

    #[test]
    fn route_classification_threshold() {
        assert_eq!(classify_route(1200.0, 1150.0), RouteShape::Piston);
        assert_eq!(classify_route(1200.0, 600.0), RouteShape::OneWay);
        // exactly at 10% of the smaller leg still counts as out-and-back
        assert_eq!(classify_route(1100.0, 1000.0), RouteShape::Piston);
        // a perfectly flat route is a degenerate out-and-back
        assert_eq!(classify_route(0.0, 0.0), RouteShape::Piston);
    }

    #[test]
    fn route_flags_interaction() {
        let mut record = ActivityRecord::empty("https://example.com/r");
        record.elevation_up_m = Some(1200.0);
        record.elevation_down_m = Some(600.0);

        assert!(route_accepted(&record, false, false));
        assert!(route_accepted(&record, true, true));
        assert!(route_accepted(&record, false, true));
        assert!(!route_accepted(&record, true, false));

        record.elevation_down_m = None;
        assert!(!route_accepted(&record, true, false));
        assert!(route_accepted(&record, false, false));
    }
}
