#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR upstream client and XBRL normalizer.
//!
//! This crate provides:
//!
//! - [`EdgarClient`] - Rate-limited, retrying, cache-backed [`FilingSource`]
//! - [`Normalizer`] - Turns raw directory, submissions and facts payloads into entities
//! - [`tags`] - Canonical metric to XBRL tag aliases
//!
//! # Example
//!
//! ```no_run
//! use filings_core::{Cik, FilingSource, FilingsConfig};
//! use filings_edgar::{EdgarClient, Normalizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FilingsConfig::from_env()?;
//!     let client = EdgarClient::new(&config)?;
//!
//!     let cik = Cik::parse("320193")?;
//!     let facts = client.fetch_company_facts(&cik, false).await?;
//!     let metrics = Normalizer::new().extract_metrics(&"AAPL".into(), &facts.payload);
//!     println!("{} metrics ({:?})", metrics.len(), facts.origin);
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use filings_cache::{Metadata, ResourceCaches, ResourceKind};
use filings_core::{
    Cik, FetchOrigin, Fetched, FilingSource, FilingsConfig, FilingsError, Result, RetryConfig,
};
use rand::Rng;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Payload normalization.
pub mod normalize;
/// Metric tag aliases.
pub mod tags;

pub use normalize::{CompanyProfile, DirectoryEntry, Normalizer};

/// SEC EDGAR data API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Taxonomy queried for single concepts.
const CONCEPT_TAXONOMY: &str = "us-gaap";

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    const fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Upstream endpoint locations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Full URL of the ticker directory.
    pub directory_url: String,
    /// Base URL for submissions, company facts and concepts.
    pub data_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            directory_url: COMPANY_TICKERS_URL.to_string(),
            data_base_url: EDGAR_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one base URL (for local test servers).
    #[must_use]
    pub fn at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            directory_url: format!("{base}/files/company_tickers.json"),
            data_base_url: base.to_string(),
        }
    }

    fn submissions(&self, cik: &Cik) -> String {
        format!("{}/submissions/CIK{cik}.json", self.data_base_url)
    }

    fn company_facts(&self, cik: &Cik) -> String {
        format!("{}/api/xbrl/companyfacts/CIK{cik}.json", self.data_base_url)
    }

    fn concept(&self, cik: &Cik, tag: &str) -> String {
        format!(
            "{}/api/xbrl/companyconcept/CIK{cik}/{CONCEPT_TAXONOMY}/{tag}.json",
            self.data_base_url
        )
    }
}

/// SEC EDGAR client.
///
/// Every fetch consults the matching cache first unless a refresh is forced. Network
/// requests are spaced by the configured minimum delay, and HTTP 429/403 responses
/// are retried with exponential backoff plus jitter. When a request fails for good,
/// the last cached copy is served even if expired; without one the result is an
/// empty object marked [`FetchOrigin::Unavailable`].
#[derive(Debug)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Mutex<RateLimiter>,
    caches: Mutex<ResourceCaches>,
    endpoints: Endpoints,
    retry: RetryConfig,
}

impl EdgarClient {
    /// Create a new client from configuration.
    ///
    /// The SEC requires an identifying user agent, e.g.
    /// `"AppName/Version (contact@email.com)"`. Persisted caches are loaded from
    /// `config.cache_dir`.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if the user agent is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: &FilingsConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            return Err(FilingsError::Config("User agent must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FilingsError::Config(e.to_string()))?;

        Ok(Self {
            client,
            rate_limiter: Mutex::new(RateLimiter::new(config.rate_limit_delay)),
            caches: Mutex::new(ResourceCaches::load(&config.cache_dir, &config.ttl)),
            endpoints: Endpoints::default(),
            retry: config.retry.clone(),
        })
    }

    /// Overrides the upstream endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Clears every cache and persists the empty state.
    ///
    /// # Errors
    /// Returns [`FilingsError::Cache`] if the caches cannot be written.
    pub async fn clear_caches(&self) -> Result<()> {
        let mut caches = self.caches.lock().await;
        caches.clear();
        caches.save()?;
        info!(dir = %caches.dir().display(), "Cleared upstream caches");
        Ok(())
    }

    async fn fetch(
        &self,
        kind: ResourceKind,
        key: String,
        url: String,
        force_refresh: bool,
    ) -> Result<Fetched> {
        if !force_refresh {
            let caches = self.caches.lock().await;
            let cache = caches.get(kind);
            if let (Some(payload), Some(entry)) = (cache.get(&key), cache.entry(&key)) {
                debug!(
                    cache = %kind,
                    key = %key,
                    age_secs = entry.age().num_seconds(),
                    "Cache hit"
                );
                return Ok(Fetched::new(payload.clone(), FetchOrigin::Cache));
            }
            debug!(cache = %kind, key = %key, "Cache miss");
        }

        match self.request(kind, &url).await {
            Ok(payload) => {
                let mut caches = self.caches.lock().await;
                let mut metadata = Metadata::new();
                metadata.insert("url".to_string(), Value::String(url));
                caches
                    .get_mut(kind)
                    .set(key, payload.clone(), None, Some(metadata));
                if let Err(e) = caches.save() {
                    warn!(cache = %kind, error = %e, "Failed to persist caches");
                }
                Ok(Fetched::new(payload, FetchOrigin::Network))
            }
            Err(e) => {
                let caches = self.caches.lock().await;
                match caches.get(kind).get_stale(&key) {
                    Some(payload) => {
                        error!(url = %url, error = %e, "Upstream request failed, serving cached copy");
                        Ok(Fetched::new(payload.clone(), FetchOrigin::StaleCache))
                    }
                    None => {
                        error!(url = %url, error = %e, "Upstream request failed, no cached copy");
                        Ok(Fetched::unavailable())
                    }
                }
            }
        }
    }

    /// Issues a GET, retrying rate-limit responses.
    async fn request(&self, kind: ResourceKind, url: &str) -> Result<Value> {
        let mut attempt = 0;
        loop {
            self.rate_limiter.lock().await.wait().await;

            debug!(url, attempt, "Fetching from SEC");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FilingsError::Network(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| FilingsError::Network(e.to_string()))?;
                return parse_body(kind, &body);
            }

            if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::FORBIDDEN {
                return Err(FilingsError::UpstreamUnavailable(format!(
                    "HTTP {status} from {url}"
                )));
            }

            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let throttled = FilingsError::RateLimited { retry_after };

            if attempt >= self.retry.max_retries {
                return Err(FilingsError::UpstreamUnavailable(format!(
                    "{throttled} (gave up after {attempt} retries)"
                )));
            }
            attempt += 1;

            let delay = self.backoff(attempt).max(retry_after.unwrap_or_default());
            warn!(
                url,
                %status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, backing off"
            );
            sleep(delay).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = self.retry.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.retry.backoff(attempt) + jitter
    }
}

/// Parses a response body. A ticker directory may also arrive as tab-delimited
/// `ticker\tcik` lines, which are converted to the flat dictionary shape.
fn parse_body(kind: ResourceKind, body: &str) -> Result<Value> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(e) if kind == ResourceKind::Directory => {
            parse_tab_delimited(body).ok_or_else(|| FilingsError::Parse(e.to_string()))
        }
        Err(e) => Err(FilingsError::Parse(format!("Failed to parse {kind} payload: {e}"))),
    }
}

fn parse_tab_delimited(body: &str) -> Option<Value> {
    let mut directory = Map::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parsed = line
            .split_once('\t')
            .and_then(|(ticker, cik)| Some((ticker, cik.trim().parse::<u64>().ok()?)));
        let Some((ticker, cik)) = parsed else {
            warn!(line, "Skipping malformed directory line");
            continue;
        };
        directory.insert(
            cik.to_string(),
            json!({"cik_str": cik, "ticker": ticker.trim(), "title": ""}),
        );
    }
    (!directory.is_empty()).then_some(Value::Object(directory))
}

#[async_trait]
impl FilingSource for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn fetch_ticker_directory(&self, force_refresh: bool) -> Result<Fetched> {
        self.fetch(
            ResourceKind::Directory,
            "company_tickers".to_string(),
            self.endpoints.directory_url.clone(),
            force_refresh,
        )
        .await
    }

    async fn fetch_submissions(&self, cik: &Cik, force_refresh: bool) -> Result<Fetched> {
        self.fetch(
            ResourceKind::Submissions,
            format!("submissions_{cik}"),
            self.endpoints.submissions(cik),
            force_refresh,
        )
        .await
    }

    async fn fetch_company_facts(&self, cik: &Cik, force_refresh: bool) -> Result<Fetched> {
        self.fetch(
            ResourceKind::Facts,
            format!("facts_{cik}"),
            self.endpoints.company_facts(cik),
            force_refresh,
        )
        .await
    }

    async fn fetch_concept(&self, cik: &Cik, tag: &str, force_refresh: bool) -> Result<Fetched> {
        self.fetch(
            ResourceKind::Concept,
            format!("concept_{cik}_{tag}"),
            self.endpoints.concept(cik, tag),
            force_refresh,
        )
        .await
    }
}
