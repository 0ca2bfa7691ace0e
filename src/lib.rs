//! # hydro-sweep: Seed Sweeps and Result Consolidation for Rainfall-Runoff LSTMs
//!
//! hydro-sweep drives an external training program over a list of random
//! seeds and turns the per-station results it leaves behind into analysis
//! tables.
//!
//! ## Components
//!
//! - **Seed sweep** ([`sweep`]): for each seed, run `train`, locate the run
//!   directory it produced ([`locate`]), then run `evaluate` on it. Failures
//!   are recorded in a [`experiment::SweepStore`] ledger and never halt the
//!   sweep.
//! - **Result consolidation** ([`results`]): read a run's `cfg.json`, pick the
//!   matching results artifact, and reshape the station → (`qobs`, `qsim`)
//!   mapping into one Arrow table per quantity, exportable as Parquet
//!   ([`storage`]).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hydro_sweep::config::SweepConfig;
//! use hydro_sweep::sweep::{ProcessExecutor, SweepRunner};
//!
//! let config = SweepConfig::from_file("sweep.toml")?;
//! let mut runner = SweepRunner::new(config, ProcessExecutor);
//! let ledger = runner.run();
//! println!("{} seeds run", ledger.run_count());
//! # Ok::<(), hydro_sweep::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod locate;
pub mod results;
pub mod storage;
pub mod sweep;

pub use config::SweepConfig;
pub use error::{Error, Result};
pub use results::{consolidate, load_results, ConsolidatedTables, RunResults, StationResults};
