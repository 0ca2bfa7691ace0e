//! Run Record - outcome of one seed of a sweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Status of a seed within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Seed is queued but not yet started.
    Pending,
    /// Training or evaluation is executing.
    Running,
    /// Training and evaluation both exited successfully.
    Success,
    /// A subprocess could not be launched or exited non-zero.
    Failed,
    /// No run directory was found, so evaluation was skipped.
    Skipped,
}

/// Run Record tracks one seed from training through evaluation.
///
/// Exit codes are `None` when the step never ran or the process was
/// terminated by a signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    seed: u64,
    model_name: String,
    status: RunStatus,
    run_dir: Option<PathBuf>,
    train_exit: Option<i32>,
    evaluate_exit: Option<i32>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    note: Option<String>,
}

impl RunRecord {
    /// Create a new run record in Pending status.
    ///
    /// # Arguments
    ///
    /// * `seed` - Random seed of the run
    /// * `model_name` - Model name used in run directory names
    #[must_use]
    pub fn new(seed: u64, model_name: impl Into<String>) -> Self {
        Self {
            seed,
            model_name: model_name.into(),
            status: RunStatus::Pending,
            run_dir: None,
            train_exit: None,
            evaluate_exit: None,
            started_at: None,
            ended_at: None,
            note: None,
        }
    }

    /// Get the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the located run directory, if any.
    #[must_use]
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    /// Get the training exit code.
    #[must_use]
    pub const fn train_exit(&self) -> Option<i32> {
        self.train_exit
    }

    /// Get the evaluation exit code.
    #[must_use]
    pub const fn evaluate_exit(&self) -> Option<i32> {
        self.evaluate_exit
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Get the note attached on completion.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Start the run, transitioning from Pending to Running.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the training exit code.
    pub fn set_train_exit(&mut self, code: Option<i32>) {
        self.train_exit = code;
    }

    /// Record the evaluation exit code.
    pub fn set_evaluate_exit(&mut self, code: Option<i32>) {
        self.evaluate_exit = code;
    }

    /// Record the run directory the evaluation step targets.
    pub fn set_run_dir(&mut self, run_dir: impl Into<PathBuf>) {
        self.run_dir = Some(run_dir.into());
    }

    /// Complete the run with the given final status.
    ///
    /// Sets the `ended_at` timestamp to now.
    pub fn complete(&mut self, status: RunStatus, note: Option<String>) {
        self.status = status;
        self.note = note;
        self.ended_at = Some(Utc::now());
    }
}
