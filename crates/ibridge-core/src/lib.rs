//! island-bridge Core - Domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `SyncTarget`, `SyncMode`, `TransferDirection`, `SyncSummary`
//! - **Path utilities** - relative/remote path mapping shared by the engine and the watcher
//! - **Configuration** - profiles, projects and engine tuning loaded from YAML or JSON
//! - **Port definitions** - Traits for adapters: `IRemoteStorage`, `IProgressObserver`
//!
//! # Architecture
//!
//! The domain module holds plain data and pure functions.
//! Ports define trait interfaces that adapter crates implement
//! (`ibridge-ssh` for remote storage, `ibridge-cli` for progress output).
//! The sync engine in `ibridge-sync` orchestrates both through these ports.

pub mod config;
pub mod domain;
pub mod ports;
