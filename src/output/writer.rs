//! Chunked CSV writer
//!
//! Records are buffered in memory and written out in batches of at most
//! `capacity` rows. Batch files are named `root.csv`, `root1.csv`,
//! `root2.csv`, ... and every batch starts with the same header row. A batch is
//! written once and never reopened.

use crate::output::guard::RunGuard;
use crate::output::{OutputError, OutputResult};
use crate::records::Record;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Default number of data rows per batch file
pub const DEFAULT_ROWS_PER_FILE: usize = 1000;

/// Returns the path of batch `index` for `root`
///
/// Batch 0 carries no numeric suffix.
pub fn batch_path(dir: &Path, root: &str, index: usize) -> PathBuf {
    if index == 0 {
        dir.join(format!("{}.csv", root))
    } else {
        dir.join(format!("{}{}.csv", root, index))
    }
}

/// What a writer left on disk once closed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub root: String,
    pub batches: Vec<PathBuf>,
    pub rows: usize,
}

/// Buffers records and flushes them to numbered batch files
///
/// The writer is a scoped resource: [`close`](Self::close) flushes whatever is
/// still buffered, and dropping an unclosed writer closes it, so an early
/// return or an error in the producing loop never loses buffered records.
#[derive(Debug)]
pub struct ChunkedWriter {
    dir: PathBuf,
    root: String,
    header: Vec<String>,
    capacity: usize,
    buffer: Vec<Record>,
    next_index: usize,
    batches: Vec<PathBuf>,
    rows_written: usize,
    closed: bool,
}

impl ChunkedWriter {
    /// Opens a writer for `root` in `dir`
    ///
    /// The run guard is consulted before anything is created. If it declines,
    /// this fails with [`OutputError::IntensiveOperationSkipped`] and the
    /// directory is left untouched.
    pub fn open(
        dir: impl Into<PathBuf>,
        root: impl Into<String>,
        header: &[&str],
        capacity: usize,
        guard: &RunGuard,
    ) -> OutputResult<Self> {
        let dir = dir.into();
        let root = root.into();

        guard.check(&dir, &root)?;
        std::fs::create_dir_all(&dir)?;

        let capacity = capacity.max(1);
        tracing::debug!("Building CSV rows for '{}' ({} per file)", root, capacity);

        Ok(Self {
            dir,
            root,
            header: header.iter().map(|h| h.to_string()).collect(),
            capacity,
            buffer: Vec::with_capacity(capacity),
            next_index: 0,
            batches: Vec::new(),
            rows_written: 0,
            closed: false,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of records waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Batches written so far
    pub fn batches(&self) -> &[PathBuf] {
        &self.batches
    }

    /// Buffers a record, flushing a full batch when capacity is reached
    pub fn append(&mut self, record: Record) -> OutputResult<()> {
        if self.closed {
            return Err(OutputError::Closed {
                root: self.root.clone(),
            });
        }

        self.buffer.push(record);
        if self.buffer.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the buffered records to a new batch file
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - The batch that was written
    /// * `Ok(None)` - Nothing was buffered
    pub fn flush(&mut self) -> OutputResult<Option<PathBuf>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let (path, file) = self.create_next_batch()?;
        tracing::info!("Saving {}", path.display());

        if let Err(e) = self.write_batch(file) {
            self.discard_batch(&path);
            return Err(e);
        }

        let saved = self.buffer.len();
        self.buffer.clear();
        self.rows_written += saved;
        self.batches.push(path.clone());
        tracing::debug!("Successfully saved {} rows", saved);

        Ok(Some(path))
    }

    /// Flushes any partial batch and closes the writer
    ///
    /// Closing twice is harmless: the second call writes nothing.
    pub fn close(&mut self) -> OutputResult<BatchSummary> {
        if !self.closed {
            let flushed = self.flush();
            self.closed = true;
            flushed?;
            tracing::debug!(
                "Closed '{}': {} rows in {} batches",
                self.root,
                self.rows_written,
                self.batches.len()
            );
        }

        Ok(BatchSummary {
            root: self.root.clone(),
            batches: self.batches.clone(),
            rows: self.rows_written,
        })
    }

    /// Writes the header and every buffered record to `file`
    fn write_batch(&self, file: File) -> OutputResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&self.header)?;
        for record in &self.buffer {
            record.write_row(&mut writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Removes a batch whose write failed and gives its index back
    ///
    /// The records stay buffered, so the next flush writes them to the same
    /// index. If the partial file cannot be removed the writer is closed
    /// instead, since a retry would repeat rows already on disk.
    fn discard_batch(&mut self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                self.next_index -= 1;
                tracing::debug!("Removed partial batch {}", path.display());
            }
            Err(e) => {
                tracing::error!(
                    "Could not remove partial batch {} ({}), closing writer for '{}'",
                    path.display(),
                    e,
                    self.root
                );
                self.closed = true;
            }
        }
    }

    /// Creates the next free batch file, never truncating an existing one
    fn create_next_batch(&mut self) -> OutputResult<(PathBuf, File)> {
        loop {
            let path = batch_path(&self.dir, &self.root, self.next_index);
            self.next_index += 1;

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!("{} already exists, trying next index", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for ChunkedWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.close() {
            tracing::error!(
                "Failed to flush {} buffered rows for '{}': {}",
                self.buffer.len(),
                self.root,
                e
            );
        }
    }
}
