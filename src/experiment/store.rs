//! Sweep Store - ledger of per-seed run records
//!
//! Records are kept in the order the seeds ran, and the ledger can be written
//! to disk as JSON so a finished sweep can be inspected later.

use super::{RunRecord, RunStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered ledger of the seeds a sweep processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStore {
    created_at: Option<DateTime<Utc>>,
    runs: Vec<RunRecord>,
}

impl SweepStore {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_at: Some(Utc::now()),
            runs: Vec::new(),
        }
    }

    /// Check if the ledger holds no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Get the number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Append a run record.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.push(run);
    }

    /// All runs, in sweep order.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Get the record for a seed.
    #[must_use]
    pub fn get_run(&self, seed: u64) -> Option<&RunRecord> {
        self.runs.iter().find(|run| run.seed() == seed)
    }

    /// Get all runs with the given status, in sweep order.
    #[must_use]
    pub fn runs_with_status(&self, status: RunStatus) -> Vec<&RunRecord> {
        self.runs.iter().filter(|run| run.status() == status).collect()
    }

    /// Number of runs with the given status.
    #[must_use]
    pub fn count(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|run| run.status() == status).count()
    }

    /// Load a ledger written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Other(format!("invalid sweep ledger: {e}")))
    }

    /// Write the ledger as pretty JSON, replacing the file atomically.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::Other(format!("cannot serialize sweep ledger: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
