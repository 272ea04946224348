//! Environment-driven configuration.
//!
//! [`FilingsConfig`] collects everything the upstream client, caches and store need:
//! the identifying user agent the upstream service requires, cache and store
//! locations, rate limiting, retry policy, and per-resource cache lifetimes.

use chrono::TimeDelta;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::{FilingsError, Result};

/// User agent used when nothing is configured.
pub const DEFAULT_USER_AGENT: &str = "Financial Dashboard/1.0 (contact@example.com)";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingsConfig {
    /// Identifying `User-Agent` sent with every upstream request.
    pub user_agent: String,
    /// Directory holding the persisted caches.
    pub cache_dir: PathBuf,
    /// Path of the entity store database.
    pub store_path: PathBuf,
    /// Minimum delay between two upstream requests.
    pub rate_limit_delay: Duration,
    /// HTTP connect/read timeout.
    pub request_timeout: Duration,
    /// Retry policy for throttled requests.
    pub retry: RetryConfig,
    /// Per-resource cache lifetimes.
    pub ttl: CacheTtls,
}

/// Retry policy for rate-limited requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_base: f64,
    /// Upper bound of the random jitter added to each backoff.
    pub max_jitter: Duration,
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (1-based), excluding jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_base.powi(exponent);
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            max_jitter: Duration::from_millis(1000),
        }
    }
}

/// Default lifetimes of the four upstream resource caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Ticker directory.
    pub directory: TimeDelta,
    /// Company submission histories.
    pub submissions: TimeDelta,
    /// Company facts.
    pub facts: TimeDelta,
    /// Single concepts.
    pub concept: TimeDelta,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            directory: TimeDelta::days(7),
            submissions: TimeDelta::days(1),
            facts: TimeDelta::days(1),
            concept: TimeDelta::days(1),
        }
    }
}

impl Default for FilingsConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_dir: PathBuf::from("cache"),
            store_path: PathBuf::from("data/filings.db"),
            rate_limit_delay: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            ttl: CacheTtls::default(),
        }
    }
}

impl FilingsConfig {
    /// Loads configuration from a `.env` file (if present) and the process environment.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if the resulting user agent is empty.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if the resulting user agent is empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_agent = match var("SEC_API_USER_AGENT") {
            Some(ua) => ua,
            None if var("SEC_API_NAME").is_some() || var("SEC_API_EMAIL").is_some() => {
                let name = var("SEC_API_NAME").unwrap_or_else(|| "SEC Dashboard".to_string());
                let email = var("SEC_API_EMAIL").unwrap_or_else(|| "contact@example.com".to_string());
                match var("SEC_API_PHONE") {
                    Some(phone) => format!("{name} ({email}, {phone})"),
                    None => format!("{name} ({email})"),
                }
            }
            None => defaults.user_agent.clone(),
        };
        if user_agent.trim().is_empty() {
            return Err(FilingsError::Config("User agent must not be empty".to_string()));
        }

        let parse = |key: &str| -> Option<f64> {
            let raw = var(key)?;
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
                _ => {
                    warn!(key, value = %raw, "Ignoring unparseable configuration value");
                    None
                }
            }
        };
        let days = |key: &str, default: TimeDelta| {
            parse(key)
                .and_then(|d| TimeDelta::try_seconds((d * 86_400.0) as i64))
                .unwrap_or(default)
        };

        Ok(Self {
            user_agent,
            cache_dir: var("FILINGS_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            store_path: var("FILINGS_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            rate_limit_delay: parse("FILINGS_RATE_LIMIT_DELAY_MS")
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.rate_limit_delay),
            request_timeout: parse("FILINGS_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.request_timeout),
            retry: RetryConfig {
                max_retries: parse("FILINGS_MAX_RETRIES")
                    .map(|n| n as u32)
                    .unwrap_or(defaults.retry.max_retries),
                backoff_base: parse("FILINGS_BACKOFF_BASE").unwrap_or(defaults.retry.backoff_base),
                max_jitter: parse("FILINGS_BACKOFF_JITTER_MS")
                    .map(|ms| Duration::from_millis(ms as u64))
                    .unwrap_or(defaults.retry.max_jitter),
            },
            ttl: CacheTtls {
                directory: days("FILINGS_TTL_DIRECTORY_DAYS", defaults.ttl.directory),
                submissions: days("FILINGS_TTL_SUBMISSIONS_DAYS", defaults.ttl.submissions),
                facts: days("FILINGS_TTL_FACTS_DAYS", defaults.ttl.facts),
                concept: days("FILINGS_TTL_CONCEPT_DAYS", defaults.ttl.concept),
            },
        })
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Sets the minimum delay between requests.
    #[must_use]
    pub const fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FilingsConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FilingsConfig::default());
        assert_eq!(config.ttl.directory, TimeDelta::days(7));
        assert_eq!(config.ttl.facts, TimeDelta::days(1));
        assert_eq!(config.rate_limit_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_user_agent_composed_from_parts() {
        let config = FilingsConfig::from_lookup(lookup(&[
            ("SEC_API_NAME", "Acme Research"),
            ("SEC_API_EMAIL", "ops@acme.test"),
            ("SEC_API_PHONE", "555-0100"),
        ]))
        .unwrap();
        assert_eq!(config.user_agent, "Acme Research (ops@acme.test, 555-0100)");

        let explicit = FilingsConfig::from_lookup(lookup(&[
            ("SEC_API_USER_AGENT", "Explicit/2.0 (me@acme.test)"),
            ("SEC_API_NAME", "ignored"),
        ]))
        .unwrap();
        assert_eq!(explicit.user_agent, "Explicit/2.0 (me@acme.test)");
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = FilingsConfig::from_lookup(lookup(&[
            ("FILINGS_MAX_RETRIES", "5"),
            ("FILINGS_RATE_LIMIT_DELAY_MS", "250"),
            ("FILINGS_TTL_DIRECTORY_DAYS", "not-a-number"),
            ("FILINGS_TTL_FACTS_DAYS", "2"),
            ("FILINGS_CACHE_DIR", "/tmp/filings-cache"),
        ]))
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.ttl.directory, TimeDelta::days(7));
        assert_eq!(config.ttl.facts, TimeDelta::days(2));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/filings-cache"));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_secs(2));
        assert_eq!(retry.backoff(3), Duration::from_secs(8));

        let flat = RetryConfig {
            backoff_base: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(flat.backoff(1), Duration::ZERO);
    }
}
