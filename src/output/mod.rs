//! Output module for batched CSV records
//!
//! This module handles:
//! - Buffering records and rolling them over into numbered batch files
//! - Guarding against repeating a scrape whose output already exists
//! - Reading earlier batches back as input for later scrape stages
//! - Summarizing what a trawl produced

mod guard;
mod reader;
pub mod stats;
mod writer;

pub use guard::{Confirm, OverwritePolicy, RunGuard, TerminalConfirm};
pub use reader::{find_batches, read_batches};
pub use stats::{print_statistics, TrawlStatistics};
pub use writer::{batch_path, BatchSummary, ChunkedWriter, DEFAULT_ROWS_PER_FILE};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// Output from an earlier run exists and overwrite was declined. Callers
    /// treat this as a successful no-op, not a failure.
    #[error("Skipping intensive operation, {} already exists", .path.display())]
    IntensiveOperationSkipped { path: PathBuf },

    #[error("Writer for '{root}' is already closed")]
    Closed { root: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutputError {
    /// Returns true when the error only signals a deliberately skipped run
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::IntensiveOperationSkipped { .. })
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
