//! Subprocess invocations of the external training/evaluation program

use crate::config::ProgramConfig;
use crate::locate::RUN_DIR_ENV;
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Render a flag the way the program's argument parser expects it.
#[must_use]
pub const fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// A fully-resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    /// Invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Start from the configured command prefix (`["python", "main.py"]`).
    fn from_program(config: &ProgramConfig) -> Result<Self> {
        let (program, prefix) = config.command.split_first().ok_or_else(|| {
            Error::SweepConfig("program.command must name an executable".to_string())
        })?;
        let mut invocation = Self::new(program.clone()).args(prefix.iter().cloned());
        invocation.current_dir.clone_from(&config.working_dir);
        Ok(invocation)
    }

    /// `<program> train --camels_root <path> --cache_data <bool> --no_static <bool>`
    /// then `--concat_static True` when set, the extra training arguments, and
    /// finally `--seed <seed>`.
    ///
    /// When `handshake` is set, its path is exported in [`RUN_DIR_ENV`].
    ///
    /// # Errors
    ///
    /// Returns error if the configured command is empty
    pub fn train(config: &ProgramConfig, seed: u64, handshake: Option<&Path>) -> Result<Self> {
        let mut invocation = Self::from_program(config)?
            .arg("train")
            .arg("--camels_root")
            .arg(config.camels_root.display().to_string())
            .arg("--cache_data")
            .arg(python_bool(config.cache_data))
            .arg("--no_static")
            .arg(python_bool(config.no_static));
        if config.concat_static {
            invocation = invocation.arg("--concat_static").arg(python_bool(true));
        }
        invocation = invocation
            .args(config.extra_train_args.iter().cloned())
            .arg("--seed")
            .arg(seed.to_string());

        if let Some(file) = handshake {
            invocation = invocation.env(RUN_DIR_ENV, file.display().to_string());
        }
        Ok(invocation)
    }

    /// `<program> evaluate --camels_root <path> --run_dir <path>`
    ///
    /// # Errors
    ///
    /// Returns error if the configured command is empty
    pub fn evaluate(config: &ProgramConfig, run_dir: &Path) -> Result<Self> {
        Ok(Self::from_program(config)?
            .arg("evaluate")
            .arg("--camels_root")
            .arg(config.camels_root.display().to_string())
            .arg("--run_dir")
            .arg(run_dir.display().to_string()))
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables.
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Working directory of the child, if not inherited.
    #[must_use]
    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Value following `flag` in the argument list.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a finished subprocess exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    code: Option<i32>,
}

impl CommandOutcome {
    /// Outcome with the given exit code (`None`: terminated by a signal).
    #[must_use]
    pub const fn new(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Exit code, if the process exited normally.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// `true` for exit code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for CommandOutcome {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.code())
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("termination by signal"),
        }
    }
}

/// Runs invocations to completion.
///
/// Implementations block until the child exits; there is no timeout.
pub trait CommandExecutor {
    /// Run one invocation and wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the program cannot be started. A non-zero
    /// exit is not an error.
    fn execute(&mut self, invocation: &Invocation) -> Result<CommandOutcome>;
}

/// Executor spawning real OS processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<CommandOutcome> {
        debug!("Executing {invocation}");

        let mut command = Command::new(invocation.program());
        command.args(invocation.arguments());
        for (key, value) in invocation.envs() {
            command.env(key, value);
        }
        if let Some(dir) = invocation.current_dir() {
            command.current_dir(dir);
        }

        let status = command.status().map_err(|source| Error::Spawn {
            program: invocation.program().to_string(),
            source,
        })?;
        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_config() -> ProgramConfig {
        ProgramConfig {
            camels_root: PathBuf::from("/data/CAMELS_US"),
            ..ProgramConfig::default()
        }
    }

    #[test]
    fn test_train_command_line() {
        let train = Invocation::train(&program_config(), 666, None).unwrap();
        assert_eq!(
            train.to_string(),
            concat!(
                "python main.py train --camels_root /data/CAMELS_US ",
                "--cache_data True --no_static True --seed 666"
            )
        );
        assert!(train.envs().is_empty());
    }

    #[test]
    fn test_train_with_concat_static_and_extras() {
        let mut config = program_config();
        config.no_static = false;
        config.concat_static = true;
        config.extra_train_args = vec!["--epochs".to_string(), "5".to_string()];

        let train = Invocation::train(&config, 1, Some(Path::new("/tmp/last_run"))).unwrap();
        assert_eq!(train.flag_value("--no_static"), Some("False"));
        assert_eq!(train.flag_value("--concat_static"), Some("True"));
        assert_eq!(train.flag_value("--epochs"), Some("5"));
        assert_eq!(train.arguments().last().map(String::as_str), Some("1"));
        assert_eq!(
            train.envs(),
            &[(RUN_DIR_ENV.to_string(), "/tmp/last_run".to_string())]
        );
    }

    #[test]
    fn test_evaluate_command_line() {
        let evaluate =
            Invocation::evaluate(&program_config(), Path::new("runs/run_lstm_seed5")).unwrap();
        assert_eq!(
            evaluate.to_string(),
            "python main.py evaluate --camels_root /data/CAMELS_US --run_dir runs/run_lstm_seed5"
        );
    }

    #[test]
    fn test_empty_command_is_error() {
        let config = ProgramConfig {
            command: Vec::new(),
            ..ProgramConfig::default()
        };
        assert!(Invocation::train(&config, 1, None).is_err());
    }

    #[test]
    fn test_outcome() {
        assert!(CommandOutcome::new(Some(0)).success());
        assert!(!CommandOutcome::new(Some(2)).success());
        assert!(!CommandOutcome::new(None).success());
        assert_eq!(CommandOutcome::new(Some(2)).to_string(), "exit code 2");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_reports_exit_code() {
        let mut executor = ProcessExecutor;
        let outcome = executor
            .execute(&Invocation::new("sh").args(["-c", "exit 3"]))
            .unwrap();
        assert_eq!(outcome.code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_passes_env_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut invocation = Invocation::new("sh")
            .args(["-c", "printf %s \"$HYDRO_SWEEP_RUN_DIR_FILE\" > out.txt"])
            .env(RUN_DIR_ENV, "marker");
        invocation.current_dir = Some(dir.path().to_path_buf());

        let outcome = ProcessExecutor.execute(&invocation).unwrap();
        assert!(outcome.success());
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "marker");
    }

    #[test]
    fn test_process_executor_missing_program() {
        let err = ProcessExecutor
            .execute(&Invocation::new("definitely-not-a-real-program-7f3a"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
