//! FieldSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `OfflineInterview`, `SyncQueueItem`, reference data payloads
//! - **Name normalization** - canonical administrative-area name resolution
//! - **Port definitions** - Traits for adapters: `IKeyValueStore`, `IRemoteDataSource`, `IConnectivityProbe`
//! - **State machine** - offline interview sync states
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. The sync crate
//! orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod normalizer;
pub mod ports;
