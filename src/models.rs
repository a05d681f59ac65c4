//! Core data models used throughout yamarec.
//!
//! These types represent the activity records and listing rows that flow
//! through the retrieval pipeline and the on-disk cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized representation of one hiking activity report.
///
/// Every field except the source URL is optional: the sites' markup is
/// unreliable and each field is extracted independently, so a record with
/// gaps is a normal outcome. Derived numeric fields are recomputed at
/// finalization (also after a cache hit) and are therefore not serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Source URL — always present, doubles as the cache identity key.
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Raw date text as shown on the page, decoration included.
    #[serde(default)]
    pub date_text: Option<String>,
    /// Parsed calendar date; may be absent even when `date_text` is present.
    #[serde(skip)]
    pub date: Option<NaiveDate>,
    /// Route difficulty grade (S/A/B/C/D on Yamareco).
    #[serde(default)]
    pub level: Option<String>,
    /// Scheduled/standard course duration, `H:MM` text.
    #[serde(default)]
    pub duration: Option<String>,
    /// Moving time actually recorded, `H:MM` text.
    #[serde(default)]
    pub actual_duration: Option<String>,
    /// Rest time, `H:MM` text.
    #[serde(default)]
    pub rest_duration: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub elevation_gained: Option<String>,
    #[serde(default)]
    pub elevation_lost: Option<String>,
    /// Pace relative to the standard course time, percent.
    #[serde(default)]
    pub pace: Option<f64>,
    #[serde(default)]
    pub weather: Option<String>,
    /// Access directions, one line per entry.
    #[serde(default)]
    pub access: Vec<String>,
    #[serde(default)]
    pub course_info: Option<String>,
    #[serde(default)]
    pub impression: Option<String>,
    #[serde(default)]
    pub photo_captions: Vec<String>,
    #[serde(default)]
    pub prefecture: Option<String>,

    /// Distance in km, derived from `distance`.
    #[serde(skip)]
    pub distance_km: Option<f64>,
    /// Total minutes, derived from `duration`.
    #[serde(skip)]
    pub duration_minutes: Option<i64>,
    /// Elevation gained in meters, derived from `elevation_gained`.
    #[serde(skip)]
    pub elevation_up_m: Option<f64>,
    /// Elevation lost in meters, derived from `elevation_lost`.
    #[serde(skip)]
    pub elevation_down_m: Option<f64>,
}

impl ActivityRecord {
    /// A record with only the URL populated. This is what retrieval returns
    /// when no adapter claims the URL or the static fetch fails outright.
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Baseline validity: duration and distance were both extracted.
    /// Adapters may tighten this (see `SiteAdapter::is_valid`).
    pub fn has_core_fields(&self) -> bool {
        self.duration.is_some() && self.distance.is_some()
    }
}

/// One row of a mountain's recent-records listing.
///
/// `date` is reparsed from `date_text` after a cache restore; rows whose
/// text no longer parses are dropped there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    #[serde(default)]
    pub title: Option<String>,
    pub date_text: String,
    #[serde(skip)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub has_photo: bool,
    #[serde(default)]
    pub has_route: bool,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub elevation: Option<String>,
    pub url: String,
}
