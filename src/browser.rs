//! Headless-browser session for the authenticated dynamic-render fallback.
//!
//! The session is process-wide: created lazily on the first fallback attempt
//! and reused for every later one, never explicitly torn down (the process
//! is short-lived). Retrieval reaches it through [`SessionProvider`] so
//! tests can substitute a scripted fake without touching global state.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::cell::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetch::USER_AGENT;

/// Operations an adapter's login/wait sequence needs from a rendered page.
pub trait DynamicSession {
    fn navigate(&self, url: &str) -> anyhow::Result<()>;
    /// Blocks until the selector appears, bounded by the session's wait
    /// timeout.
    fn wait_for(&self, selector: &str) -> anyhow::Result<()>;
    fn fill(&self, selector: &str, value: &str) -> anyhow::Result<()>;
    fn click(&self, selector: &str) -> anyhow::Result<()>;
    /// Serialized HTML of the current document.
    fn content(&self) -> anyhow::Result<String>;
}

/// Hands out the shared dynamic session, creating it on first use.
pub trait SessionProvider {
    /// The shared session, or `None` when the browser cannot be launched.
    fn acquire(&self) -> Option<&dyn DynamicSession>;
}

/// A live headless-Chromium tab.
pub struct HeadlessSession {
    // Owns the browser process; dropping it would kill the tab.
    _browser: Browser,
    tab: Arc<Tab>,
    wait_timeout: Duration,
}

impl HeadlessSession {
    pub fn launch(wait_timeout: Duration) -> anyhow::Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1280, 800)))
            .build()
            .map_err(|e| anyhow::anyhow!("launch options: {}", e))?;
        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;
        // Replace the default agent string, which carries the
        // HeadlessChrome automation token.
        tab.set_user_agent(USER_AGENT, None, None)?;
        Ok(Self {
            _browser: browser,
            tab,
            wait_timeout,
        })
    }
}

impl DynamicSession for HeadlessSession {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn wait_for(&self, selector: &str) -> anyhow::Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)?;
        Ok(())
    }

    fn fill(&self, selector: &str, value: &str) -> anyhow::Result<()> {
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)?;
        element.click()?;
        element.type_into(value)?;
        Ok(())
    }

    fn click(&self, selector: &str) -> anyhow::Result<()> {
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)?;
        element.click()?;
        Ok(())
    }

    fn content(&self) -> anyhow::Result<String> {
        self.tab.get_content()
    }
}

/// Lazily-launched shared session. A launch failure is remembered; later
/// acquisitions degrade without retrying the launch.
pub struct LazyBrowser {
    wait_timeout: Duration,
    session: OnceCell<Option<HeadlessSession>>,
}

impl LazyBrowser {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            session: OnceCell::new(),
        }
    }
}

impl SessionProvider for LazyBrowser {
    fn acquire(&self) -> Option<&dyn DynamicSession> {
        self.session
            .get_or_init(|| match HeadlessSession::launch(self.wait_timeout) {
                Ok(session) => {
                    debug!("headless session launched");
                    Some(session)
                }
                Err(e) => {
                    warn!(error = %e, "headless session unavailable");
                    None
                }
            })
            .as_ref()
            .map(|s| s as &dyn DynamicSession)
    }
}
