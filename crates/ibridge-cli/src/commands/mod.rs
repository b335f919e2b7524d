pub mod completions;
pub mod config;
pub mod git;
pub mod init;
pub mod status;
pub mod sync;
pub mod watch;
