//! TOML configuration.
//!
//! Every setting has a default, so the tool runs without a config file.
//! Credentials are deliberately absent here — they come from the
//! per-site environment variable pairs and nowhere else.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{self, JsonCache};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache root; namespaces live underneath it.
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    /// Record-cache expiry in hours, -1 for no expiry.
    #[serde(default = "default_record_expire_hours")]
    pub record_expire_hours: i64,
    /// Record-cache file-count bound, -1 for unbounded.
    #[serde(default = "default_record_max_entries")]
    pub record_max_entries: i64,
    /// Listing-cache expiry in hours, -1 for no expiry.
    #[serde(default = "default_listing_expire_hours")]
    pub listing_expire_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            record_expire_hours: default_record_expire_hours(),
            record_max_entries: default_record_max_entries(),
            listing_expire_hours: default_listing_expire_hours(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("yamarec")
}

fn default_record_expire_hours() -> i64 {
    cache::NEVER_EXPIRES
}

fn default_record_max_entries() -> i64 {
    1000
}

fn default_listing_expire_hours() -> i64 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between consecutive requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Per-condition wait timeout for the rendered-fetch fallback.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

fn default_wait_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    /// Path to the mountain-name dictionary JSON.
    #[serde(default = "default_directory_path")]
    pub path: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            path: default_directory_path(),
        }
    }
}

fn default_directory_path() -> PathBuf {
    PathBuf::from("./mountain_dic.json")
}

impl Config {
    pub fn record_cache(&self) -> JsonCache {
        JsonCache::new(
            self.cache.root.join("records"),
            self.cache.record_expire_hours,
            self.cache.record_max_entries,
        )
    }

    pub fn listing_cache(&self) -> JsonCache {
        JsonCache::new(
            self.cache.root.join("listing"),
            self.cache.listing_expire_hours,
            cache::UNBOUNDED,
        )
    }

}

impl BrowserConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

/// Loads and validates a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.cache.record_expire_hours < cache::NEVER_EXPIRES {
        anyhow::bail!("cache.record_expire_hours must be >= -1");
    }
    if config.cache.record_max_entries < cache::UNBOUNDED
        || config.cache.record_max_entries == 0
    {
        anyhow::bail!("cache.record_max_entries must be -1 or > 0");
    }
    if config.cache.listing_expire_hours < cache::NEVER_EXPIRES {
        anyhow::bail!("cache.listing_expire_hours must be >= -1");
    }
    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }
    if config.browser.wait_timeout_secs == 0 {
        anyhow::bail!("browser.wait_timeout_secs must be > 0");
    }

    Ok(config)
}

/// Loads the file when it exists, otherwise falls back to defaults — the
/// tool is usable with no configuration at all.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.record_expire_hours, cache::NEVER_EXPIRES);
        assert_eq!(config.cache.record_max_entries, 1000);
        assert_eq!(config.cache.listing_expire_hours, 1);
        assert_eq!(config.http.request_delay_ms, 1000);
        assert_eq!(config.browser.wait_timeout_secs, 5);
    }

    #[test]
    fn rejects_zero_entry_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yamarec.toml");
        std::fs::write(&path, "[cache]\nrecord_max_entries = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.http.timeout_secs, 30);
    }
}
