//! Static mountain-name directory.
//!
//! The dictionary JSON maps a mountain name (or alias) to the entries that
//! share it; it is generated offline and consumed read-only here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One directory entry: canonical name, phonetic reading, altitude label,
/// and the mountain's record-listing URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Mountain {
    pub name: String,
    #[serde(default)]
    pub yomi: String,
    #[serde(default)]
    pub altitude: Option<String>,
    pub url: String,
}

pub struct MountainDirectory {
    mountains: BTreeMap<String, Vec<Mountain>>,
}

impl MountainDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mountain dictionary: {}", path.display()))?;
        let mountains: BTreeMap<String, Vec<Mountain>> = serde_json::from_str(&content)
            .with_context(|| "Failed to parse mountain dictionary")?;
        Ok(Self { mountains })
    }

    pub fn from_entries(mountains: BTreeMap<String, Vec<Mountain>>) -> Self {
        Self { mountains }
    }

    /// Entries for a mountain name: exact key match first, then a
    /// bidirectional substring scan over all names and readings,
    /// deduplicated by canonical name.
    pub fn lookup(&self, name: &str) -> Vec<&Mountain> {
        if let Some(entries) = self.mountains.get(name) {
            return entries.iter().collect();
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        for entries in self.mountains.values() {
            for mountain in entries {
                if substring_match(&mountain.name, name) || substring_match(&mountain.yomi, name) {
                    if seen.insert(mountain.name.as_str()) {
                        result.push(mountain);
                    }
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.mountains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mountains.is_empty()
    }
}

/// Either string containing the other counts; empty strings never match.
fn substring_match(known: &str, query: &str) -> bool {
    if known.is_empty() || query.is_empty() {
        return false;
    }
    known.contains(query) || query.contains(known)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MountainDirectory {
        let json = r#"{
            "富士山": [
                {"name": "富士山", "yomi": "ふじさん", "altitude": "3,776m",
                 "url": "https://www.yamareco.com/modules/yamareco/ptlist.php?ptid=1"}
            ],
            "雲取山": [
                {"name": "雲取山", "yomi": "くもとりやま", "altitude": "2,017m",
                 "url": "https://www.yamareco.com/modules/yamareco/ptlist.php?ptid=2"},
                {"name": "雲取山", "yomi": "くもとりやま", "altitude": "2,017m",
                 "url": "https://yamap.com/mountains/35"}
            ]
        }"#;
        let mountains = serde_json::from_str(json).unwrap();
        MountainDirectory::from_entries(mountains)
    }

    #[test]
    fn exact_match_wins() {
        let directory = sample();
        let found = directory.lookup("雲取山");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.name == "雲取山"));
    }

    #[test]
    fn falls_back_to_substring_on_name() {
        let directory = sample();
        let found = directory.lookup("富士");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "富士山");
    }

    #[test]
    fn falls_back_to_substring_on_reading() {
        let directory = sample();
        let found = directory.lookup("ふじ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "富士山");
    }

    #[test]
    fn fallback_deduplicates_by_name() {
        let directory = sample();
        let found = directory.lookup("雲取");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn unknown_name_is_empty_not_an_error() {
        let directory = sample();
        assert!(directory.lookup("存在しない山").is_empty());
    }
}
