//! Storage Module
//!
//! This module provides the shared state behind the cache: the bounded
//! key/value store and the stats registry the `stats` command reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                    Store                      │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │               Mutex                     │  │
//! │  │  ┌───────────────┐  ┌────────────────┐  │  │
//! │  │  │ HashMap       │  │ StatsRegistry  │  │  │
//! │  │  │ key → value   │  │ cmd_* counters │  │  │
//! │  │  └───────────────┘  └────────────────┘  │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! One mutex covers both the map and the counters so a command's whole
//! read-modify-write is a single critical section, shared by every
//! session task through an `Arc<Store>`.
//!
//! ## Example
//!
//! ```
//! use memline::storage::Store;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::with_capacity(1000));
//!
//! store.insert("name", "Ariz").unwrap();
//! let results = store.lookup(&["name"]);
//! assert_eq!(results[0].1.as_deref(), Some("Ariz"));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{StatsRegistry, Store, StoreError, DEFAULT_ITEM_LIMIT};
