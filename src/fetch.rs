//! Blocking HTTP transport for the static fetch path.
//!
//! Retrieval talks to the network through the [`Transport`] trait so tests
//! can substitute canned HTML fixtures for live pages.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Desktop user-agent sent on every request. The dynamic-fallback session
/// reuses it so rendered fetches are indistinguishable from static ones.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Why a static fetch produced no document.
///
/// Callers degrade on every variant; the distinction exists so logs and
/// retrieval reports can tell "site unreachable" from "page rejected us".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// DNS, connection, or timeout failure — the request never completed.
    Network(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The response arrived but its body could not be read as text.
    Body(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(e) => write!(f, "network failure: {}", e),
            FetchError::Status(code) => write!(f, "HTTP status {}", code),
            FetchError::Body(e) => write!(f, "unreadable response body: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

/// A source of HTML documents keyed by URL.
pub trait Transport {
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Live HTTP transport with a minimum inter-request interval.
///
/// The delay is a courtesy to the source sites, not a correctness
/// requirement; consecutive scrapes in one invocation are spaced by
/// roughly a second.
pub struct HttpClient {
    client: reqwest::blocking::Client,
    request_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, request_delay_ms: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            request_delay: Duration::from_millis(request_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    fn pace(&self) {
        let mut last = self.last_request.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.request_delay {
                std::thread::sleep(self.request_delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        self.pace();
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().map_err(|e| FetchError::Body(e.to_string()))
    }
}
