//! Run statistics
//!
//! This module tallies the outcomes of a trawl and prints a short report
//! once all scrape stages have finished.

use crate::crawler::{RunOutcome, TargetEnd};

/// Trawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrawlStatistics {
    /// Runs that attempted all of their targets
    pub runs_completed: u64,

    /// Runs skipped because their output already existed
    pub runs_skipped: u64,

    /// Runs that stopped on an output error
    pub runs_failed: u64,

    /// Runs that had no targets
    pub runs_empty: u64,

    /// Total number of targets attempted
    pub targets: u64,

    /// Targets abandoned after all fetch retries failed
    pub failed_targets: Vec<String>,

    /// Total number of pages fetched
    pub pages: u64,

    pub records_written: u64,
    pub records_skipped: u64,

    /// Batch files written across all runs
    pub batches: u64,

    /// Output roots that failed, with their error
    pub errors: Vec<(String, String)>,
}

impl TrawlStatistics {
    /// Adds one run outcome to the totals
    pub fn record(&mut self, outcome: &RunOutcome) {
        for target in outcome.targets() {
            self.targets += 1;
            self.pages += target.pages as u64;
            self.records_skipped += target.skipped as u64;
            if let TargetEnd::FetchFailed(_) = target.end {
                self.failed_targets.push(target.label.clone());
            }
        }

        match outcome {
            RunOutcome::Completed { summary, .. } => {
                self.runs_completed += 1;
                self.records_written += summary.rows as u64;
                self.batches += summary.batches.len() as u64;
            }
            RunOutcome::Skipped { .. } => self.runs_skipped += 1,
            RunOutcome::NothingToDo { .. } => self.runs_empty += 1,
            RunOutcome::Failed { root, error, targets } => {
                self.runs_failed += 1;
                self.records_written += targets.iter().map(|t| t.records as u64).sum::<u64>();
                self.errors.push((root.clone(), error.to_string()));
            }
        }
    }

    /// Returns true if any run or target failed
    pub fn has_failures(&self) -> bool {
        self.runs_failed > 0 || !self.failed_targets.is_empty()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &TrawlStatistics) {
    println!("=== Trawl Statistics ===\n");

    println!("Runs:");
    println!("  Completed: {}", stats.runs_completed);
    println!("  Skipped (already scraped): {}", stats.runs_skipped);
    println!("  Nothing to do: {}", stats.runs_empty);
    println!("  Failed: {}", stats.runs_failed);
    println!();

    println!("Overview:");
    println!("  Targets attempted: {}", stats.targets);
    println!("  Pages fetched: {}", stats.pages);
    println!("  Records written: {}", stats.records_written);
    println!("  Records skipped: {}", stats.records_skipped);
    println!("  Batch files written: {}", stats.batches);
    println!();

    if !stats.failed_targets.is_empty() {
        println!("Failed Targets ({}):", stats.failed_targets.len());
        for label in &stats.failed_targets {
            println!("  - {}", label);
        }
        println!();
    }

    if !stats.errors.is_empty() {
        println!("Output Errors:");
        for (root, error) in &stats.errors {
            println!("  {}: {}", root, error);
        }
        println!();
    }

    let succeeded = stats.targets - stats.failed_targets.len() as u64;
    let success_rate = if stats.targets > 0 {
        (succeeded as f64 / stats.targets as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} targets scraped)",
        success_rate, succeeded, stats.targets
    );
}
