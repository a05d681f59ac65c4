//! URL-keyed JSON file cache with time-boxed expiry and a bounded entry count.
//!
//! One file per key, under a namespace directory:
//!
//! ```text
//! <cache-root>/<namespace>/<derived-filename>.json
//! { "lastUpdate": "YYYY-MM-DD HH:MM:SS", "data": ... }
//! ```
//!
//! The filename is derived from the URL by stripping the scheme and leading
//! host, then replacing everything outside `[A-Za-z0-9_-]` with `_`. This is
//! readable and filesystem-legal but deliberately not a hash: two distinct
//! URLs that normalize to the same string alias to the same slot. Adequate
//! for the two source domains; documented limitation, not a bug.

use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::debug;

/// Expiry sentinel: entries never go stale.
pub const NEVER_EXPIRES: i64 = -1;
/// Entry-count sentinel: no eviction.
pub const UNBOUNDED: i64 = -1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "lastUpdate")]
    last_update: String,
    data: T,
}

/// A single cache namespace with its own expiry and retention policy.
pub struct JsonCache {
    dir: PathBuf,
    expire_hours: i64,
    max_entries: i64,
}

impl JsonCache {
    pub fn new(dir: impl Into<PathBuf>, expire_hours: i64, max_entries: i64) -> Self {
        Self {
            dir: dir.into(),
            expire_hours,
            max_entries,
        }
    }

    /// Derives the storage filename for a URL. Deterministic and idempotent;
    /// `http` and `https` variants of the same resource share a slot.
    pub fn cache_filename(url: &str) -> String {
        static SCHEME: OnceLock<Regex> = OnceLock::new();
        static HOST: OnceLock<Regex> = OnceLock::new();
        static UNSAFE: OnceLock<Regex> = OnceLock::new();
        let scheme = SCHEME.get_or_init(|| Regex::new(r"^https?://").unwrap());
        let host = HOST.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\-_]+\.[a-zA-Z]{2,}").unwrap());
        let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]").unwrap());

        let stripped = scheme.replace(url, "");
        let stripped = host.replace(&stripped, "");
        let safe = unsafe_chars.replace_all(&stripped, "_");
        let safe = safe.replace(['.', '=', '#'], "_");
        format!("{}.json", safe)
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        self.dir.join(Self::cache_filename(url))
    }

    /// Loads the entry for `url` if present and still within the expiry
    /// window. Missing, stale, and malformed files all read as a miss —
    /// cache corruption must never take the tool down.
    pub fn load<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let path = self.cache_path(url);
        let text = std::fs::read_to_string(&path).ok()?;
        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(e) => e,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "discarding malformed cache file");
                return None;
            }
        };
        if self.is_fresh(&envelope.last_update) {
            Some(envelope.data)
        } else {
            None
        }
    }

    /// Writes `value` under `url`, then enforces the entry-count limit by
    /// evicting the oldest-modified files. Eviction is best-effort.
    pub fn store<T: Serialize>(&self, url: &str, value: &T) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let envelope = Envelope {
            last_update: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            data: value,
        };
        let body = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(self.cache_path(url), body)?;
        self.enforce_entry_limit();
        Ok(())
    }

    /// Deletes every entry in this namespace, best-effort per file.
    pub fn clear(&self) {
        for path in self.entry_paths() {
            let _ = std::fs::remove_file(path);
        }
    }

    fn is_fresh(&self, last_update: &str) -> bool {
        if self.expire_hours == NEVER_EXPIRES {
            return true;
        }
        let Ok(stored) = NaiveDateTime::parse_from_str(last_update, TIMESTAMP_FORMAT) else {
            return false;
        };
        Local::now().naive_local() < stored + Duration::hours(self.expire_hours)
    }

    fn entry_paths(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect()
    }

    fn enforce_entry_limit(&self) {
        if self.max_entries == UNBOUNDED {
            return;
        }
        let mut files: Vec<(PathBuf, SystemTime)> = self
            .entry_paths()
            .into_iter()
            .filter_map(|p| {
                let mtime = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((p, mtime))
            })
            .collect();
        files.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in files.into_iter().skip(self.max_entries.max(0) as usize) {
            let _ = std::fs::remove_file(path);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
