//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! path resolution against a sync root, lookups of named profiles and
//! projects, and parsing of sync modes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    /// Unrecognised sync mode or direction string
    #[error("Invalid sync mode: {0}")]
    InvalidSyncMode(String),

    /// No profile with the given name exists in the configuration
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// No project with the given name exists in the configuration
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
