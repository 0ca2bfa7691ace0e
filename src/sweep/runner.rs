//! Seed sweep runner - train, locate, evaluate, one seed at a time

use super::{CommandExecutor, Invocation};
use crate::config::SweepConfig;
use crate::experiment::{RunRecord, RunStatus, SweepStore};
use crate::locate::RunLocator;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Runs the configured seeds sequentially.
///
/// A seed's failure never stops the sweep: non-zero exits and launch
/// failures are logged and recorded, and a seed without a run directory is
/// skipped at the evaluation step.
pub struct SweepRunner<E: CommandExecutor> {
    config: SweepConfig,
    locator: RunLocator,
    executor: E,
}

impl<E: CommandExecutor> SweepRunner<E> {
    /// Runner for a configuration, locating run directories as configured.
    #[must_use]
    pub fn new(config: SweepConfig, executor: E) -> Self {
        let locator = RunLocator::from_config(&config);
        Self {
            config,
            locator,
            executor,
        }
    }

    /// Replace the run directory locator.
    #[must_use]
    pub fn with_locator(mut self, locator: RunLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Get the executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every seed and return the ledger.
    ///
    /// The ledger is also written to `config.ledger` when set. A failed write
    /// is logged; the returned ledger is complete either way.
    pub fn run(&mut self) -> SweepStore {
        let mut store = SweepStore::new();
        let seeds = self.config.seeds.clone();

        info!(
            "Sweeping {} seeds of {}",
            seeds.len(),
            self.config.model_variant()
        );
        for seed in seeds {
            let record = self.run_seed(seed);
            store.add_run(record);
        }

        if let Some(path) = &self.config.ledger {
            match store.save(path) {
                Ok(()) => info!("Sweep ledger written to {}", path.display()),
                Err(e) => error!("Could not write sweep ledger {}: {e}", path.display()),
            }
        }
        store
    }

    /// Train, locate, and evaluate a single seed.
    pub fn run_seed(&mut self, seed: u64) -> RunRecord {
        let model_name = self.config.model_variant().model_name();
        let mut record = RunRecord::new(seed, model_name);
        record.start();

        info!("Running training with seed {seed}");
        if let Err(e) = self.locator.prepare() {
            warn!("Could not clear handshake file: {e}");
        }

        let handshake = self.locator.handshake_file();
        let train = match Invocation::train(&self.config.program, seed, handshake) {
            Ok(train) => train,
            Err(e) => return fail(record, &e.to_string()),
        };
        let train_ok = match self.executor.execute(&train) {
            Ok(outcome) => {
                record.set_train_exit(outcome.code());
                if !outcome.success() {
                    warn!("Training with seed {seed} ended with {outcome}");
                }
                outcome.success()
            }
            Err(e) => return fail(record, &e.to_string()),
        };

        let run_dir = match self.locator.locate(model_name, seed) {
            Ok(Some(run_dir)) => run_dir,
            Ok(None) => {
                warn!("No run directory found for seed {seed}");
                let note = Some("no run directory found".to_string());
                record.complete(RunStatus::Skipped, note);
                return record;
            }
            Err(e) => return fail(record, &e.to_string()),
        };

        info!(
            "Evaluating the model for seed {seed} using run directory {}",
            run_dir.display()
        );
        record.set_run_dir(&run_dir);

        let program_dir = self.program_path(&run_dir);
        let evaluate = match Invocation::evaluate(&self.config.program, &program_dir) {
            Ok(evaluate) => evaluate,
            Err(e) => return fail(record, &e.to_string()),
        };
        match self.executor.execute(&evaluate) {
            Ok(outcome) => {
                record.set_evaluate_exit(outcome.code());
                if !outcome.success() {
                    warn!("Evaluation with seed {seed} ended with {outcome}");
                    record.complete(RunStatus::Failed, Some(format!("evaluate: {outcome}")));
                } else if !train_ok {
                    let note = Some("train exited non-zero".to_string());
                    record.complete(RunStatus::Failed, note);
                } else {
                    record.complete(RunStatus::Success, None);
                }
            }
            Err(e) => return fail(record, &e.to_string()),
        }

        record
    }

    /// Path of a run directory as seen from the program's working directory.
    fn program_path(&self, run_dir: &Path) -> PathBuf {
        self.config
            .program
            .working_dir
            .as_deref()
            .and_then(|dir| run_dir.strip_prefix(dir).ok())
            .map_or_else(|| run_dir.to_path_buf(), Path::to_path_buf)
    }
}

fn fail(mut record: RunRecord, message: &str) -> RunRecord {
    error!("Seed {}: {message}", record.seed());
    record.complete(RunStatus::Failed, Some(message.to_string()));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::CommandOutcome;
    use crate::{Error, Result};

    /// Records invocations; training creates `run_{model}_x_seed{seed}` unless
    /// the seed is listed in `silent`.
    struct FakeProgram {
        runs_dir: PathBuf,
        silent: Vec<u64>,
        train_code: i32,
        calls: Vec<Invocation>,
    }

    impl CommandExecutor for FakeProgram {
        fn execute(&mut self, invocation: &Invocation) -> Result<CommandOutcome> {
            self.calls.push(invocation.clone());
            if invocation.arguments().iter().any(|a| a == "train") {
                let seed: u64 = invocation.flag_value("--seed").unwrap().parse().unwrap();
                if !self.silent.contains(&seed) {
                    let run_dir = self.runs_dir.join(format!("run_lstm_x_seed{seed}"));
                    std::fs::create_dir_all(run_dir)?;
                }
                return Ok(CommandOutcome::new(Some(self.train_code)));
            }
            Ok(CommandOutcome::new(Some(0)))
        }
    }

    fn runner(dir: &Path, seeds: Vec<u64>, silent: Vec<u64>) -> SweepRunner<FakeProgram> {
        let config = SweepConfig {
            seeds,
            runs_dir: dir.to_path_buf(),
            ..SweepConfig::default()
        };
        let program = FakeProgram {
            runs_dir: dir.to_path_buf(),
            silent,
            train_code: 0,
            calls: Vec::new(),
        };
        SweepRunner::new(config, program)
    }

    #[test]
    fn test_all_seeds_trained_and_evaluated() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), vec![666, 777], vec![]);

        let store = runner.run();

        assert_eq!(store.count(RunStatus::Success), 2);
        let calls = &runner.executor().calls;
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].arguments()[1], "evaluate");
        assert_eq!(
            calls[1].flag_value("--run_dir").map(PathBuf::from),
            Some(dir.path().join("run_lstm_x_seed666"))
        );
    }

    #[test]
    fn test_missing_run_dir_skips_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), vec![1, 2, 3], vec![2]);

        let store = runner.run();

        let statuses: Vec<RunStatus> = store.runs().iter().map(RunRecord::status).collect();
        assert_eq!(
            statuses,
            vec![RunStatus::Success, RunStatus::Skipped, RunStatus::Success]
        );

        let evaluated: Vec<&str> = runner
            .executor()
            .calls
            .iter()
            .filter(|c| c.arguments()[1] == "evaluate")
            .filter_map(|c| c.flag_value("--run_dir"))
            .collect();
        assert_eq!(evaluated.len(), 2);
        assert!(evaluated.iter().all(|d| !d.ends_with("seed2")));
    }

    #[test]
    fn test_failed_training_still_evaluates() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), vec![9], vec![]);
        runner.executor.train_code = 1;

        let record = runner.run_seed(9);

        assert_eq!(record.train_exit(), Some(1));
        assert_eq!(record.evaluate_exit(), Some(0));
        assert_eq!(record.status(), RunStatus::Failed);
    }

    #[test]
    fn test_ledger_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), vec![5], vec![]);
        runner.config.ledger = Some(dir.path().join("sweep.json"));

        let store = runner.run();

        let loaded = SweepStore::load(&dir.path().join("sweep.json")).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_ledger_parent_directory_created() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("missing/sweep.json");
        let mut runner = runner(dir.path(), vec![5], vec![]);
        runner.config.ledger = Some(ledger.clone());

        let store = runner.run();

        assert_eq!(runner.executor().calls.len(), 2);
        assert_eq!(store.count(RunStatus::Success), 1);
        assert_eq!(SweepStore::load(&ledger).unwrap(), store);
    }

    #[test]
    fn test_unwritable_ledger_keeps_results() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut runner = runner(dir.path(), vec![5, 6], vec![]);
        runner.config.ledger = Some(blocker.join("sweep.json"));

        let store = runner.run();

        assert_eq!(store.run_count(), 2);
        assert_eq!(store.count(RunStatus::Success), 2);
    }

    struct Unlaunchable;

    impl CommandExecutor for Unlaunchable {
        fn execute(&mut self, invocation: &Invocation) -> Result<CommandOutcome> {
            Err(Error::Spawn {
                program: invocation.program().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[test]
    fn test_launch_failure_does_not_halt_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig {
            seeds: vec![1, 2],
            runs_dir: dir.path().to_path_buf(),
            ..SweepConfig::default()
        };
        let mut runner = SweepRunner::new(config, Unlaunchable);

        let store = runner.run();

        assert_eq!(store.run_count(), 2);
        assert_eq!(store.count(RunStatus::Failed), 2);
        assert!(store.runs()[0].note().unwrap().contains("python"));
    }

    #[test]
    fn test_program_path_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), vec![1], vec![]);
        runner.config.program.working_dir = Some(dir.path().to_path_buf());

        let path = runner.program_path(&dir.path().join("runs/run_lstm_seed1"));
        assert_eq!(path, PathBuf::from("runs/run_lstm_seed1"));
    }
}
