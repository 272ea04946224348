#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching for upstream filing payloads.
//!
//! - [`ExpiringCache`] - Generic expiring key/value cache with JSON persistence
//! - [`ResourceCaches`] - One cache per upstream resource type, with its own TTL

/// Expiring key/value cache.
pub mod expiring;
/// Per-resource cache set.
pub mod resources;

pub use expiring::{CacheEntry, ExpiringCache, Metadata};
pub use resources::{ResourceCaches, ResourceKind};
