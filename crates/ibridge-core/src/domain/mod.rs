//! Domain types and pure helpers
//!
//! This module contains the core domain types for island-bridge:
//! - Sync targets, sync modes and transfer directions
//! - Path mapping between the local and remote trees
//! - Pass summaries
//! - Domain-specific error types

pub mod errors;
pub mod paths;
pub mod summary;
pub mod target;

// Re-export commonly used types
pub use errors::DomainError;
pub use summary::SyncSummary;
pub use target::{SyncMode, SyncTarget, TransferDirection};
