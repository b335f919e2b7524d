//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStorage`] - File operations on the remote host
//! - [`IProgressObserver`] - Per-file and per-pass progress reporting

pub mod progress;
pub mod remote_storage;

pub use progress::{IProgressObserver, NoopProgress};
pub use remote_storage::{IRemoteStorage, RemoteEntry};
