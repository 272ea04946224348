//! Upstream source trait.
//!
//! [`FilingSource`] is the seam between the sync orchestrator and the upstream
//! filing service. Each operation returns the raw JSON payload together with where it
//! came from, so callers can tell a failed fetch from a legitimately empty answer.

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Result, types::Cik};

/// Where a fetched payload came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Fresh response from the upstream service.
    Network,
    /// Unexpired cache entry; no request was made.
    Cache,
    /// Expired cache entry served because the upstream request failed.
    StaleCache,
    /// The request failed and nothing was cached. The payload is an empty object.
    Unavailable,
}

/// A raw upstream payload and its origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    /// Raw JSON payload.
    pub payload: Value,
    /// Where the payload came from.
    pub origin: FetchOrigin,
}

impl Fetched {
    /// Wraps a payload.
    #[must_use]
    pub const fn new(payload: Value, origin: FetchOrigin) -> Self {
        Self { payload, origin }
    }

    /// Empty result for a failed fetch with no cached fallback.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(Value::Object(serde_json::Map::new()), FetchOrigin::Unavailable)
    }

    /// Returns true if the fetch failed without a fallback.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.origin == FetchOrigin::Unavailable
    }
}

/// Source of raw filing data.
#[async_trait]
pub trait FilingSource: Send + Sync + std::fmt::Debug {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// Fetches the ticker directory.
    async fn fetch_ticker_directory(&self, force_refresh: bool) -> Result<Fetched>;

    /// Fetches a company's submission history.
    async fn fetch_submissions(&self, cik: &Cik, force_refresh: bool) -> Result<Fetched>;

    /// Fetches all tagged facts reported by a company.
    async fn fetch_company_facts(&self, cik: &Cik, force_refresh: bool) -> Result<Fetched>;

    /// Fetches the observations of a single concept tag.
    async fn fetch_concept(&self, cik: &Cik, tag: &str, force_refresh: bool) -> Result<Fetched>;
}
