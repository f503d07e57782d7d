//! Clip archiver library.
//!
//! Harvests clip metadata for one creator account into SQLite, month by
//! month, then downloads the videos with a bounded worker pool.
//!
//! # Architecture
//!
//! - [`db`] - Database connection and schema management
//! - [`store`] - Clip records, download status and the repository seam
//! - [`api`] - Authentication and the paginated clip listing endpoint
//! - [`harvest`] - Monthly windows walked into the store
//! - [`download`] - Two-tier downloads and the worker pool orchestrator
//! - [`paths`] - Deterministic output paths
//! - [`sidecar`] - JSON metadata files next to clips
//! - [`progress`] - Progress events for a UI layer

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod db;
pub mod download;
pub mod harvest;
pub mod paths;
pub mod progress;
pub mod sidecar;
pub mod store;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use db::{Database, DatabaseOptions, DbError};
pub use store::{ClipRecord, ClipStore, DownloadStatus, Namespace, StoreError};
