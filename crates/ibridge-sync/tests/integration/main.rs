//! Integration tests for ibridge-sync
//!
//! Drives full passes and single-file operations of the SyncEngine against
//! an in-memory remote tree with scriptable failures.

mod common;

mod test_passes;
mod test_single_file;
