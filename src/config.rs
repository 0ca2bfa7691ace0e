//! Sweep configuration
//!
//! Every experiment constant (seed list, dataset root, runs directory, the
//! external program) lives in one [`SweepConfig`] loaded from TOML and passed
//! to each component explicitly.
//!
//! ```toml
//! seeds = [666, 777, 888]
//! runs_dir = "runs"
//!
//! [program]
//! command = ["python", "main.py"]
//! camels_root = "data/CAMELS_US"
//! cache_data = true
//! no_static = true
//! ```

use crate::experiment::ModelVariant;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seeds to train and evaluate, in order
    #[serde(default = "default_seeds")]
    pub seeds: Vec<u64>,

    /// Directory the training program writes run directories into
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,

    /// External training/evaluation program
    #[serde(default)]
    pub program: ProgramConfig,

    /// How the run directory of a finished training is found
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Where to write the sweep ledger (JSON), if anywhere
    #[serde(default)]
    pub ledger: Option<PathBuf>,
}

/// External program invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Program and leading arguments, e.g. `["python", "main.py"]`
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Root of the CAMELS US dataset, passed as `--camels_root`
    #[serde(default = "default_camels_root")]
    pub camels_root: PathBuf,

    /// Passed as `--cache_data`
    #[serde(default = "default_true")]
    pub cache_data: bool,

    /// Train without static catchment attributes
    #[serde(default = "default_true")]
    pub no_static: bool,

    /// Concatenate static attributes to the dynamic inputs (plain LSTM)
    #[serde(default)]
    pub concat_static: bool,

    /// Extra arguments appended to every training command
    #[serde(default)]
    pub extra_train_args: Vec<String>,

    /// Working directory for both subprocesses (defaults to the current one)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Run directory discovery settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// File the training program writes its run directory into.
    ///
    /// When unset, or when the file is missing after training, the most
    /// recently modified matching directory is used instead.
    #[serde(default)]
    pub handshake_file: Option<PathBuf>,
}

fn default_seeds() -> Vec<u64> {
    vec![666, 777, 888]
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_command() -> Vec<String> {
    vec!["python".to_string(), "main.py".to_string()]
}

fn default_camels_root() -> PathBuf {
    PathBuf::from("CAMELS_US")
}

const fn default_true() -> bool {
    true
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            camels_root: default_camels_root(),
            cache_data: true,
            no_static: true,
            concat_static: false,
            extra_train_args: Vec::new(),
            working_dir: None,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            seeds: default_seeds(),
            runs_dir: default_runs_dir(),
            program: ProgramConfig::default(),
            locator: LocatorConfig::default(),
            ledger: None,
        }
    }
}

impl SweepConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// [`validate`](Self::validate)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::SweepConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::SweepConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the sweep relies on.
    ///
    /// # Errors
    ///
    /// Returns error if there are no seeds, a seed is repeated, or the
    /// program command is empty
    pub fn validate(&self) -> Result<()> {
        if self.seeds.is_empty() {
            return Err(Error::SweepConfig("seed list is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for seed in &self.seeds {
            if !seen.insert(seed) {
                return Err(Error::SweepConfig(format!("seed {seed} is listed twice")));
            }
        }

        match self.program.command.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err(Error::SweepConfig(
                "program.command must name an executable".to_string(),
            )),
        }
    }

    /// Model variant trained by this sweep.
    #[must_use]
    pub const fn model_variant(&self) -> ModelVariant {
        ModelVariant::from_flags(self.program.no_static, self.program.concat_static)
    }

    /// Resolve a path relative to the program working directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.program.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
