//! Site adapters and their dispatch registry.
//!
//! Each source site gets one [`SiteAdapter`] encapsulating its markup
//! conventions: field extraction, date format, and the authenticated
//! dynamic-render path. Dispatch is first-match-wins over a fixed, ordered
//! registry — the variant set is small and known at build time.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         AdapterRegistry          │
//! │   ┌──────────┐   ┌──────────┐    │
//! │   │ Yamareco │   │  YAMAP   │    │
//! │   └──────────┘   └──────────┘    │
//! └───────────────┬──────────────────┘
//!                 ▼
//!       resolve(url) → RecordRetriever
//! ```

use chrono::NaiveDate;
use scraper::Html;

use crate::browser::DynamicSession;
use crate::models::{ActivityRecord, RecentEntry};
use crate::sites::{Yamap, Yamareco};

/// A username/password pair read from the site's environment variables.
///
/// Absence is a normal, non-error condition: the dynamic fallback is simply
/// unavailable without it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Reads a credentials pair from the environment. Either variable missing
/// or empty yields `None`.
pub(crate) fn env_credentials(user_var: &str, password_var: &str) -> Option<Credentials> {
    let user = std::env::var(user_var).ok().filter(|v| !v.is_empty())?;
    let password = std::env::var(password_var).ok().filter(|v| !v.is_empty())?;
    Some(Credentials { user, password })
}

/// One source site's extraction strategy.
///
/// Every extraction method is tolerant: a field the markup does not carry is
/// simply absent in the output. Only `login` surfaces errors, and those are
/// swallowed by the retriever's fallback handling.
pub trait SiteAdapter {
    /// Short site name used in logs and reports.
    fn name(&self) -> &str;

    /// URL prefix this adapter claims ownership of.
    fn url_prefix(&self) -> &str;

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with(self.url_prefix())
    }

    /// Parses the site's date text, decoration included. Format mismatch
    /// yields `None` rather than an error.
    fn parse_date(&self, text: &str) -> Option<NaiveDate>;

    /// Extracts a detail page into a partial record. Never fails; missing
    /// markup leaves fields empty.
    fn extract(&self, document: &Html, url: &str) -> ActivityRecord;

    /// Extracts a recent-records listing page.
    fn extract_listing(&self, document: &Html) -> Vec<RecentEntry>;

    /// Whether an extracted record is complete enough to be worth showing.
    /// Baseline is duration + distance; adapters may tighten.
    fn is_valid(&self, record: &ActivityRecord) -> bool {
        record.has_core_fields()
    }

    /// Credentials for the authenticated dynamic-render path, if configured.
    fn credentials(&self) -> Option<Credentials>;

    /// Drives the site's login form on a rendered session and waits for the
    /// site-specific logged-in signal.
    fn login(&self, session: &dyn DynamicSession, credentials: &Credentials)
        -> anyhow::Result<()>;

    /// Selector that signals the record article finished rendering.
    fn article_ready_selector(&self) -> &str;
}

/// Ordered adapter registry; resolution is first-match-wins.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registry pre-loaded with the built-in site adapters, in priority
    /// order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Yamareco));
        registry.register(Box::new(Yamap));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn SiteAdapter>) {
        self.adapters.push(adapter);
    }

    /// First registered adapter claiming the URL, or `None` for an
    /// unrecognized site.
    pub fn resolve(&self, url: &str) -> Option<&dyn SiteAdapter> {
        self.adapters
            .iter()
            .find(|a| a.can_handle(url))
            .map(|a| a.as_ref())
    }

    pub fn adapters(&self) -> &[Box<dyn SiteAdapter>] {
        &self.adapters
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
