#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for filing synchronization.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - [`EntityStore`](store::EntityStore) - Keyed persistence for all entities
//! - [`FilingSource`](source::FilingSource) - Raw upstream payloads
//! - [`FilingsConfig`](config::FilingsConfig) - Environment-driven configuration
//! - [`FilingsError`](error::FilingsError) - Error taxonomy

/// Environment-driven configuration.
pub mod config;
/// Error types for filing operations.
pub mod error;
/// Metric period, form type and metric name definitions.
pub mod period;
/// Upstream source trait.
pub mod source;
/// Entity store trait.
pub mod store;
/// Core data types (Cik, Ticker, Filing, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use config::{CacheTtls, FilingsConfig, RetryConfig};
pub use error::{FilingsError, Result};
pub use period::{FormType, MetricName, MetricPeriod};
pub use source::{FetchOrigin, Fetched, FilingSource};
pub use store::{EntityStore, Upsert};
pub use types::{
    Cik, Company, CompanyIdentity, Filing, FinancialMetric, MetricKey, Ticker, normalize_cik,
};
