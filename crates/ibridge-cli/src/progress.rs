//! Console progress observer
//!
//! Prints one line per finished file. Workers call in concurrently, so the
//! running count is atomic and each line is written with a single `println!`.
//! Unchanged files advance the count silently, so it always ends at the total.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ibridge_core::domain::{SyncMode, TransferDirection};
use ibridge_core::ports::IProgressObserver;

pub struct ConsoleProgress {
    root: PathBuf,
    total: AtomicUsize,
    done: AtomicUsize,
    show_skipped: bool,
}

impl ConsoleProgress {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            show_skipped: false,
        }
    }

    /// Also print a line for every skipped file
    pub fn with_skipped(mut self, show: bool) -> Self {
        self.show_skipped = show;
        self
    }

    fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }

    fn counter(&self) -> String {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        format!("[{}/{}]", done, self.total.load(Ordering::Relaxed))
    }
}

impl IProgressObserver for ConsoleProgress {
    fn on_pass_started(&self, _mode: SyncMode, direction: TransferDirection, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        let verb = match direction {
            TransferDirection::Upload => "Checking",
            TransferDirection::Download => "Downloading",
        };
        println!("{} {} file{}...", verb, total, if total == 1 { "" } else { "s" });
    }

    fn on_transferred(&self, path: &Path, direction: TransferDirection) {
        let arrow = match direction {
            TransferDirection::Upload => "\u{2191}",
            TransferDirection::Download => "\u{2193}",
        };
        println!("  {} {} {}", self.counter(), arrow, self.display(path));
    }

    fn on_skipped(&self, path: &Path) {
        let counter = self.counter();
        if self.show_skipped {
            println!("  {} = {}", counter, self.display(path));
        }
    }

    fn on_ignored(&self, path: &Path) {
        if self.show_skipped {
            println!("  - {} (ignored)", self.display(path));
        }
    }

    fn on_error(&self, path: &Path, error: &anyhow::Error) {
        eprintln!(
            "  {} \u{2717} {}: {:#}",
            self.counter(),
            self.display(path),
            error
        );
    }
}
