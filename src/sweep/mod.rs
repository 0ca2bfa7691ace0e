//! Seed sweep orchestration
//!
//! For each configured seed the external program is invoked twice, blocking
//! until each invocation exits:
//!
//! ```text
//! train --seed N  ──>  locate run dir  ──>  evaluate --run_dir DIR
//!                           │
//!                           └── none found: seed skipped, sweep continues
//! ```
//!
//! Process launching sits behind [`CommandExecutor`] so the sweep can be
//! driven without a Python environment.

mod command;
mod runner;

pub use command::{python_bool, CommandExecutor, CommandOutcome, Invocation, ProcessExecutor};
pub use runner::SweepRunner;
