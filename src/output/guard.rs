//! Run guard for expensive scrapes
//!
//! A finished scrape leaves batch 0 (`root.csv`) behind. Before a writer
//! creates anything for a root whose batch 0 already exists, the guard asks
//! whether the operator really wants to repeat a run that may take many
//! minutes and load the remote site.

use crate::output::writer::batch_path;
use crate::output::{OutputError, OutputResult};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A yes/no question put to the operator
pub trait Confirm: Send + Sync {
    /// Returns true only on an explicit yes
    fn confirm(&self, message: &str) -> bool;
}

/// Asks on the terminal; an empty answer or a missing terminal means no
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        match dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Could not prompt for confirmation ({}), declining", e);
                false
            }
        }
    }
}

/// How to treat output left by an earlier run
#[derive(Clone)]
pub enum OverwritePolicy {
    /// Pre-approved: run again, writing batches after the existing ones
    Approve,

    /// Never repeat a finished run
    Decline,

    /// Ask the operator each time a finished run is found
    Ask(Arc<dyn Confirm>),
}

impl fmt::Debug for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "Approve"),
            Self::Decline => write!(f, "Decline"),
            Self::Ask(_) => write!(f, "Ask"),
        }
    }
}

/// Detects a completed earlier run for a root filename
#[derive(Debug, Clone)]
pub struct RunGuard {
    policy: OverwritePolicy,
}

impl RunGuard {
    pub fn new(policy: OverwritePolicy) -> Self {
        Self { policy }
    }

    /// Guard that prompts on the terminal
    pub fn interactive() -> Self {
        Self::new(OverwritePolicy::Ask(Arc::new(TerminalConfirm)))
    }

    /// Returns true if batch 0 for `root` exists in `dir`
    pub fn prior_run_exists(dir: &Path, root: &str) -> bool {
        batch_path(dir, root, 0).exists()
    }

    /// Decides whether a fresh run for `root` may proceed
    ///
    /// # Returns
    ///
    /// * `Ok(())` - No earlier output, or repeating it was approved
    /// * `Err(OutputError::IntensiveOperationSkipped)` - Earlier output exists
    ///   and repeating it was declined
    pub fn check(&self, dir: &Path, root: &str) -> OutputResult<()> {
        let first = batch_path(dir, root, 0);
        if !first.exists() {
            return Ok(());
        }

        let approved = match &self.policy {
            OverwritePolicy::Approve => true,
            OverwritePolicy::Decline => false,
            OverwritePolicy::Ask(confirm) => confirm.confirm(&format!(
                "{} already exists, you may be repeating an intensive operation. Continue?",
                first.display()
            )),
        };

        if approved {
            tracing::info!("Repeating run for '{}' despite existing {}", root, first.display());
            Ok(())
        } else {
            tracing::warn!("Avoiding operations that would regenerate {}", first.display());
            Err(OutputError::IntensiveOperationSkipped { path: first })
        }
    }
}
