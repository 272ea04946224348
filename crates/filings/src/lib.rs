#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Filing synchronization and fundamental analytics.
//!
//! This crate ties the workspace together. It re-exports the core types, the caches,
//! the entity stores and the SEC EDGAR client, and adds:
//!
//! - [`SyncOrchestrator`] - Pulls the ticker directory, submissions and company facts
//!   into an entity store
//! - [`Analytics`] - Time series, growth, CAGR, ratios, comparisons and sector summaries
//!
//! # Features
//!
//! - `sqlite` - SQLite entity store and [`SyncOrchestrator::from_config`] (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use filings::{Analytics, FilingsConfig, MetricName, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> filings::Result<()> {
//!     let config = FilingsConfig::from_env()?;
//!     let sync = SyncOrchestrator::from_config(&config)?;
//!
//!     sync.sync_directory(false).await?;
//!     sync.sync_company(&"AAPL".into(), false).await?;
//!
//!     let analytics = Analytics::new(sync.store().clone());
//!     let ratios = analytics.ratios_for(&"AAPL".into()).await?;
//!     println!("{ratios:?}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use filings_core::*;

// Caches
pub use filings_cache::{CacheEntry, ExpiringCache, ResourceCaches, ResourceKind};

// Entity stores
#[cfg(feature = "sqlite")]
pub use filings_store::SqliteStore;
pub use filings_store::InMemoryStore;

// Upstream
pub use filings_edgar::{CompanyProfile, DirectoryEntry, EdgarClient, Endpoints, Normalizer};

/// Fundamental analytics.
pub mod analytics;
mod sync;

pub use analytics::{
    Analytics, Comparison, FinancialRatios, SectorSummary, TimeSeries, cagr, growth_rates,
    ratios,
};
pub use sync::{CompanySyncReport, DirectorySyncReport, SyncOrchestrator};
