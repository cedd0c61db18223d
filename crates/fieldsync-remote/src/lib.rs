//! FieldSync Remote - Survey server HTTP adapter
//!
//! Implements the `IRemoteDataSource` and `IConnectivityProbe` ports from
//! `fieldsync-core` over the survey server's REST API using reqwest.
//!
//! ## Key Components
//!
//! - [`SurveyApiClient`] - Authenticated API client with per-call timeouts
//!   and status-class to `RemoteError` mapping
//! - [`HttpConnectivityProbe`] - Conservative reachability check against
//!   the server's health endpoint
//!
//! ## Error classification
//!
//! Every HTTP outcome is folded into `RemoteError` at this boundary:
//! 404 is `NotFound`, 401/403 is `Unauthorized`, connect/timeout/5xx is
//! `Network`, and an unparseable body is `Protocol`. Downstream code relies
//! on the NotFound/Network distinction and never sees raw reqwest errors.

pub mod client;
pub mod probe;

pub use client::SurveyApiClient;
pub use probe::HttpConnectivityProbe;
