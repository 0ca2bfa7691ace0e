//! Artifact Record - the results file a run is expected to contain

use super::{ModelVariant, RunConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Artifact Record names the per-station results file of a run.
///
/// The file name is fully determined by the run's model variant and seed:
/// `lstm_no_static_seed{seed}.p`, `lstm_seed{seed}.p`, or `ealstm_seed{seed}.p`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    run_dir: PathBuf,
    variant: ModelVariant,
    seed: u64,
}

impl ArtifactRecord {
    /// Create the artifact record for a variant and seed inside `run_dir`.
    #[must_use]
    pub fn new(run_dir: impl Into<PathBuf>, variant: ModelVariant, seed: u64) -> Self {
        Self {
            run_dir: run_dir.into(),
            variant,
            seed,
        }
    }

    /// Artifact record selected by a run's configuration.
    #[must_use]
    pub fn for_config(run_dir: impl Into<PathBuf>, config: &RunConfig) -> Self {
        Self::new(run_dir, config.variant(), config.seed)
    }

    /// Get the run directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Get the model variant.
    #[must_use]
    pub const fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Get the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the artifact file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.variant.artifact_file_name(self.seed)
    }

    /// Get the full artifact path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.run_dir.join(self.file_name())
    }

    /// Check whether the artifact is present on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }
}
