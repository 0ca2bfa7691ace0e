//! Run Tracking Schema
//!
//! Data structures describing the runs a sweep produces and the records the
//! external training program leaves behind.
//!
//! ## Schema Overview
//!
//! ```text
//! SweepStore (1) ──< RunRecord (N)          [one per seed]
//!
//! run directory ──── RunConfig (cfg.json)
//!                └── ArtifactRecord          [results file, named by ModelVariant]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use hydro_sweep::experiment::{ArtifactRecord, RunConfig, RunRecord, RunStatus, SweepStore};
//!
//! let config = RunConfig::new(666, true, false);
//! let artifact = ArtifactRecord::for_config("runs/run_lstm_seed666", &config);
//! assert_eq!(artifact.file_name(), "lstm_no_static_seed666.p");
//!
//! let mut store = SweepStore::new();
//! let mut run = RunRecord::new(666, "lstm");
//! run.start();
//! run.complete(RunStatus::Success, None);
//! store.add_run(run);
//! ```

mod artifact_record;
mod run_config;
mod run_record;
mod store;

pub use artifact_record::ArtifactRecord;
pub use run_config::{ModelVariant, RunConfig, RUN_CONFIG_FILE};
pub use run_record::{RunRecord, RunStatus};
pub use store::SweepStore;
