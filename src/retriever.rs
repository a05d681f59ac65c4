//! Record retrieval orchestration.
//!
//! One `fetch` walks the tiers in order:
//!
//! ```text
//! resolve adapter → cache → static GET → validity check → dynamic render → finalize
//! ```
//!
//! No tier failure is ever fatal to the caller — every failure degrades to a
//! record with fewer populated fields, and the reasons ride along in the
//! [`Retrieval`] so "site unreachable", "field absent", and "credentials
//! missing" stay distinguishable.

use scraper::Html;
use tracing::{debug, warn};

use crate::adapter::{AdapterRegistry, SiteAdapter};
use crate::browser::{LazyBrowser, SessionProvider};
use crate::cache::JsonCache;
use crate::config::Config;
use crate::fetch::{FetchError, HttpClient, Transport};
use crate::models::{ActivityRecord, RecentEntry};
use crate::units::{parse_float, parse_minutes};

/// Which tier produced the returned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalSource {
    Cache,
    Static,
    Dynamic,
    /// No adapter claimed the URL; only the URL field is populated.
    Unresolved,
}

/// Why a retrieval carries fewer fields than a complete record would.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// No registered adapter claims this URL.
    UnknownSite,
    /// The static fetch failed.
    Transport(FetchError),
    /// The dynamic fallback was wanted but no credentials are configured.
    CredentialsMissing,
    /// The dynamic fallback was attempted and failed.
    Browser(String),
}

/// A retrieved record plus how it was obtained.
#[derive(Debug)]
pub struct Retrieval {
    pub record: ActivityRecord,
    pub source: RetrievalSource,
    pub degradations: Vec<Degradation>,
}

pub struct RecordRetriever {
    registry: AdapterRegistry,
    record_cache: JsonCache,
    listing_cache: JsonCache,
    transport: Box<dyn Transport>,
    browser: Box<dyn SessionProvider>,
}

impl RecordRetriever {
    pub fn new(
        registry: AdapterRegistry,
        record_cache: JsonCache,
        listing_cache: JsonCache,
        transport: Box<dyn Transport>,
        browser: Box<dyn SessionProvider>,
    ) -> Self {
        Self {
            registry,
            record_cache,
            listing_cache,
            transport,
            browser,
        }
    }

    /// Retriever wired for live use: built-in adapters, on-disk caches,
    /// blocking HTTP, and the lazily-launched shared browser session.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            AdapterRegistry::with_builtins(),
            config.record_cache(),
            config.listing_cache(),
            Box::new(HttpClient::new(
                config.http.timeout_secs,
                config.http.request_delay_ms,
            )?),
            Box::new(LazyBrowser::new(config.browser.wait_timeout())),
        ))
    }

    /// Retrieves one activity record. Never fails; see [`Degradation`].
    pub fn fetch(&self, url: &str) -> Retrieval {
        let Some(adapter) = self.registry.resolve(url) else {
            debug!(url, "no adapter claims this URL");
            return Retrieval {
                record: ActivityRecord::empty(url),
                source: RetrievalSource::Unresolved,
                degradations: vec![Degradation::UnknownSite],
            };
        };

        if let Some(mut record) = self.record_cache.load::<ActivityRecord>(url) {
            debug!(url, "record cache hit");
            finalize(adapter, &mut record);
            return Retrieval {
                record,
                source: RetrievalSource::Cache,
                degradations: Vec::new(),
            };
        }

        let mut degradations = Vec::new();
        let mut record = match self.transport.get(url) {
            Ok(body) => adapter.extract(&Html::parse_document(&body), url),
            Err(e) => {
                warn!(url, error = %e, "static fetch failed");
                degradations.push(Degradation::Transport(e));
                ActivityRecord::empty(url)
            }
        };
        let mut source = RetrievalSource::Static;

        // A record without a duration is the trigger for the authenticated
        // rendered fetch; anything else counts as good enough.
        if record.duration.is_none() {
            match self.dynamic_fetch(adapter, url) {
                Ok(rendered) => {
                    record = rendered;
                    source = RetrievalSource::Dynamic;
                }
                Err(reason) => {
                    debug!(url, ?reason, "dynamic fallback unavailable");
                    degradations.push(reason);
                }
            }
        }

        finalize(adapter, &mut record);

        // Records without a recognizable date are presumed failed fetches
        // and are not worth memoizing.
        if record.date.is_some() {
            if let Err(e) = self.record_cache.store(url, &record) {
                warn!(url, error = %e, "could not store record cache entry");
            }
        }

        Retrieval {
            record,
            source,
            degradations,
        }
    }

    fn dynamic_fetch(
        &self,
        adapter: &dyn SiteAdapter,
        url: &str,
    ) -> Result<ActivityRecord, Degradation> {
        let Some(credentials) = adapter.credentials() else {
            return Err(Degradation::CredentialsMissing);
        };
        let Some(session) = self.browser.acquire() else {
            return Err(Degradation::Browser("session unavailable".to_string()));
        };
        let browser_err = |e: anyhow::Error| Degradation::Browser(e.to_string());

        adapter.login(session, &credentials).map_err(browser_err)?;
        session.navigate(url).map_err(browser_err)?;
        session
            .wait_for(adapter.article_ready_selector())
            .map_err(browser_err)?;
        let body = session.content().map_err(browser_err)?;
        Ok(adapter.extract(&Html::parse_document(&body), url))
    }

    /// Retrieves a mountain's recent-records listing, going through the
    /// short-lived listing cache. Failures yield an empty listing.
    pub fn fetch_recent(&self, url: &str) -> Vec<RecentEntry> {
        let Some(adapter) = self.registry.resolve(url) else {
            debug!(url, "no adapter claims this URL");
            return Vec::new();
        };

        if let Some(entries) = self.listing_cache.load::<Vec<RecentEntry>>(url) {
            debug!(url, "listing cache hit");
            // Dates are not serialized; reparse and drop rows that no
            // longer carry a usable one.
            return entries
                .into_iter()
                .filter_map(|mut entry| {
                    entry.date = adapter.parse_date(&entry.date_text);
                    entry.date.is_some().then_some(entry)
                })
                .collect();
        }

        let entries = match self.transport.get(url) {
            Ok(body) => adapter.extract_listing(&Html::parse_document(&body)),
            Err(e) => {
                warn!(url, error = %e, "listing fetch failed");
                return Vec::new();
            }
        };

        if !entries.is_empty() {
            if let Err(e) = self.listing_cache.store(url, &entries) {
                warn!(url, error = %e, "could not store listing cache entry");
            }
        }
        entries
    }

    /// Adapter-level validity of a record (duration + distance, possibly
    /// tightened by the owning site).
    pub fn is_valid(&self, record: &ActivityRecord) -> bool {
        match self.registry.resolve(&record.url) {
            Some(adapter) => adapter.is_valid(record),
            None => record.has_core_fields(),
        }
    }
}

/// Computes the derived numeric fields and reparses the date. Runs on both
/// the fresh and the cache-hit path; never synthesizes a value the text
/// fields cannot back.
fn finalize(adapter: &dyn SiteAdapter, record: &mut ActivityRecord) {
    if record.date.is_none() {
        record.date = record
            .date_text
            .as_deref()
            .and_then(|t| adapter.parse_date(t));
    }
    record.distance_km = record.distance.as_deref().and_then(parse_float);
    record.duration_minutes = record
        .duration
        .as_deref()
        .and_then(|t| parse_minutes(t).ok());
    record.elevation_up_m = record.elevation_gained.as_deref().and_then(parse_float);
    record.elevation_down_m = record.elevation_lost.as_deref().and_then(parse_float);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FakeTransport {
        pages: HashMap<String, String>,
    }

    impl FakeTransport {
        fn with_page(url: &str, body: &str) -> Self {
            let mut pages = HashMap::new();
            pages.insert(url.to_string(), body.to_string());
            Self { pages }
        }

        fn unreachable() -> Self {
            Self {
                pages: HashMap::new(),
            }
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Network("no route to host".to_string()))
        }
    }

    struct NoBrowser;

    impl SessionProvider for NoBrowser {
        fn acquire(&self) -> Option<&dyn crate::browser::DynamicSession> {
            None
        }
    }

    fn retriever_with(transport: FakeTransport, tmp: &TempDir) -> RecordRetriever {
        RecordRetriever::new(
            AdapterRegistry::with_builtins(),
            JsonCache::new(tmp.path().join("records"), cache::NEVER_EXPIRES, cache::UNBOUNDED),
            JsonCache::new(tmp.path().join("listing"), 1, cache::UNBOUNDED),
            Box::new(transport),
            Box::new(NoBrowser),
        )
    }

    const YAMARECO_URL: &str = "https://www.yamareco.com/modules/yamareco/detail-55.html";

    const YAMARECO_PAGE: &str = r#"
<html>
<head><title>雲取山 2024年11月03日(日)</title></head>
<body>
<h1>雲取山</h1>
<dl>
  <dt class="gps">GPS</dt><dd>07:30</dd>
  <dt class="distance">距離</dt><dd>12.3km</dd>
  <dt class="up">登り</dt><dd>1,200m</dd>
  <dt class="down">下り</dt><dd>1,150m</dd>
</dl>
<div class="photo-list-wrap-item-caption">七ツ石小屋</div>
<div class="photo-list-wrap-item-caption">山頂避難小屋</div>
</body>
</html>"#;

    #[test]
    fn unknown_site_yields_url_only_record() {
        let tmp = TempDir::new().unwrap();
        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);

        let retrieval = retriever.fetch("https://example.com/records/1");
        assert_eq!(retrieval.source, RetrievalSource::Unresolved);
        assert_eq!(retrieval.degradations, vec![Degradation::UnknownSite]);
        assert_eq!(retrieval.record.url, "https://example.com/records/1");
        assert!(retrieval.record.title.is_none());
        assert!(retrieval.record.duration.is_none());
    }

    #[test]
    fn static_fetch_populates_and_caches() {
        let tmp = TempDir::new().unwrap();
        let retriever = retriever_with(FakeTransport::with_page(YAMARECO_URL, YAMARECO_PAGE), &tmp);

        let retrieval = retriever.fetch(YAMARECO_URL);
        assert_eq!(retrieval.source, RetrievalSource::Static);
        assert_eq!(retrieval.record.distance_km, Some(12.3));
        assert_eq!(retrieval.record.duration_minutes, Some(450));
        assert_eq!(retrieval.record.elevation_up_m, Some(1200.0));
        assert_eq!(retrieval.record.elevation_down_m, Some(1150.0));
        assert_eq!(retrieval.record.photo_captions.len(), 2);

        // second call is served from the cache, transport untouched
        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);
        let cached = retriever.fetch(YAMARECO_URL);
        assert_eq!(cached.source, RetrievalSource::Cache);
        assert_eq!(cached.record.duration_minutes, Some(450));
        assert_eq!(cached.record.date, retrieval.record.date);
        assert!(cached.degradations.is_empty());
    }

    #[test]
    fn network_failure_degrades_to_empty_record() {
        let tmp = TempDir::new().unwrap();
        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);

        let retrieval = retriever.fetch(YAMARECO_URL);
        assert_eq!(retrieval.record.url, YAMARECO_URL);
        assert!(retrieval.record.duration.is_none());
        assert!(retrieval
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::Transport(FetchError::Network(_)))));
    }

    #[test]
    fn dateless_record_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let page = YAMARECO_PAGE.replace("2024年11月03日(日)", "");
        let retriever = retriever_with(FakeTransport::with_page(YAMARECO_URL, &page), &tmp);

        let retrieval = retriever.fetch(YAMARECO_URL);
        assert!(retrieval.record.date.is_none());
        assert_eq!(retrieval.record.duration_minutes, Some(450));

        // nothing memoized: a retriever with no network now comes up empty
        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);
        let refetched = retriever.fetch(YAMARECO_URL);
        assert!(refetched.record.duration.is_none());
    }

    const LISTING_URL: &str = "https://www.yamareco.com/modules/yamareco/ptlist.php?ptid=9";

    const LISTING_PAGE: &str = r#"
<div id="reclist">
  <div class="block">
    <div class="ft">2024年11月03日（日）</div>
    <div class="title"><a href="https://www.yamareco.com/modules/yamareco/detail-55.html">雲取山</a></div>
  </div>
</div>"#;

    #[test]
    fn listing_round_trips_through_cache() {
        let tmp = TempDir::new().unwrap();
        let retriever = retriever_with(FakeTransport::with_page(LISTING_URL, LISTING_PAGE), &tmp);

        let fresh = retriever.fetch_recent(LISTING_URL);
        assert_eq!(fresh.len(), 1);
        assert!(fresh[0].date.is_some());

        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);
        let cached = retriever.fetch_recent(LISTING_URL);
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].date, fresh[0].date);
        assert_eq!(cached[0].title.as_deref(), Some("雲取山"));
    }

    #[test]
    fn listing_restore_drops_undated_rows() {
        let tmp = TempDir::new().unwrap();
        let listing_cache =
            JsonCache::new(tmp.path().join("listing"), 1, cache::UNBOUNDED);
        let entries = vec![
            RecentEntry {
                title: Some("datable".to_string()),
                date_text: "2024年11月03日".to_string(),
                date: None,
                level: None,
                has_photo: false,
                has_route: false,
                duration: None,
                distance: None,
                elevation: None,
                url: "https://www.yamareco.com/modules/yamareco/detail-55.html".to_string(),
            },
            RecentEntry {
                title: Some("undated".to_string()),
                date_text: "N/A".to_string(),
                date: None,
                level: None,
                has_photo: false,
                has_route: false,
                duration: None,
                distance: None,
                elevation: None,
                url: "https://www.yamareco.com/modules/yamareco/detail-56.html".to_string(),
            },
        ];
        listing_cache.store(LISTING_URL, &entries).unwrap();

        let retriever = retriever_with(FakeTransport::unreachable(), &tmp);
        let restored = retriever.fetch_recent(LISTING_URL);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].title.as_deref(), Some("datable"));
    }
}
