//! Run Config - the `cfg.json` record the training program leaves in a run directory

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// File name of the configuration record inside a run directory.
pub const RUN_CONFIG_FILE: &str = "cfg.json";

/// Model variant, selected by the `no_static` / `concat_static` flags.
///
/// The variant decides both the run directory model name and the name of the
/// results artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// LSTM trained on dynamic inputs only.
    LstmNoStatic,
    /// LSTM with static attributes concatenated to every time step.
    Lstm,
    /// Entity-aware LSTM (static attributes drive the input gate).
    EaLstm,
}

impl ModelVariant {
    /// Select the variant from the two configuration flags.
    ///
    /// `no_static` wins over `concat_static`.
    #[must_use]
    pub const fn from_flags(no_static: bool, concat_static: bool) -> Self {
        if no_static {
            Self::LstmNoStatic
        } else if concat_static {
            Self::Lstm
        } else {
            Self::EaLstm
        }
    }

    /// Model name embedded in run directory names (`run_{model}*_seed{seed}`).
    #[must_use]
    pub const fn model_name(self) -> &'static str {
        match self {
            Self::LstmNoStatic | Self::Lstm => "lstm",
            Self::EaLstm => "ealstm",
        }
    }

    /// Results artifact file name for a seed.
    #[must_use]
    pub fn artifact_file_name(self, seed: u64) -> String {
        let prefix = match self {
            Self::LstmNoStatic => "lstm_no_static",
            Self::Lstm => "lstm",
            Self::EaLstm => "ealstm",
        };
        format!("{prefix}_seed{seed}.p")
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LstmNoStatic => "LSTM (no static)",
            Self::Lstm => "LSTM (concat static)",
            Self::EaLstm => "EA-LSTM",
        };
        f.write_str(name)
    }
}

/// Typed view of `cfg.json`.
///
/// The three keys the consolidator depends on are required; other well-known
/// keys are optional, and anything unrecognized lands in [`extra`](Self::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Random seed of the run
    pub seed: u64,

    /// Trained without static attributes
    pub no_static: bool,

    /// Static attributes concatenated to the inputs
    pub concat_static: bool,

    /// Run directory as recorded by the training program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,

    /// Dataset root used for training
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camels_root: Option<PathBuf>,

    /// Number of training epochs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,

    /// LSTM hidden size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u32>,

    /// Learning rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,

    /// Unrecognized keys, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RunConfig {
    /// Build a config with only the required keys set.
    #[must_use]
    pub fn new(seed: u64, no_static: bool, concat_static: bool) -> Self {
        Self {
            seed,
            no_static,
            concat_static,
            run_dir: None,
            camels_root: None,
            epochs: None,
            hidden_size: None,
            learning_rate: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Load `cfg.json` from a run directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunConfig`] if the record is absent, unreadable, or
    /// lacks one of `seed`, `no_static`, `concat_static`
    pub fn load<P: AsRef<Path>>(run_dir: P) -> Result<Self> {
        let path = run_dir.as_ref().join(RUN_CONFIG_FILE);
        let file = File::open(&path)
            .map_err(|e| Error::run_config(&path, format!("cannot open: {e}")))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::run_config(&path, e.to_string()))
    }

    /// Write the record as `cfg.json` into a run directory.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, run_dir: P) -> Result<()> {
        let path = run_dir.as_ref().join(RUN_CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::run_config(&path, e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Model variant this run was trained as.
    #[must_use]
    pub const fn variant(&self) -> ModelVariant {
        ModelVariant::from_flags(self.no_static, self.concat_static)
    }

    /// Expected results artifact file name.
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        self.variant().artifact_file_name(self.seed)
    }
}
