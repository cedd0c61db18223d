//! FieldSync Sync - Orchestration layer
//!
//! Coordinates the cache, remote, and connectivity ports into the three
//! operations interviewers actually invoke:
//!
//! - [`CachedFetcher`] - Read-through fetches with the three-tier offline
//!   fallback over area-keyed reference data
//! - [`BulkDownloader`] - Single-flight, best-effort crawl that populates
//!   the reference cache ahead of offline work
//! - [`Submitter`] - Pushes pending interviews and drains the retry queue
//!
//! Everything here operates on port traits (`IRemoteDataSource`,
//! `IConnectivityProbe`) plus the cache layer, so the whole crate is
//! testable against in-memory mocks.

pub mod downloader;
pub mod fetcher;
pub mod submitter;

pub use downloader::{BulkDownloader, DownloadSummary};
pub use fetcher::{CachedFetcher, Fetched};
pub use submitter::{Submitter, SyncReport};
