//! Per-station results of a run
//!
//! A run directory holds one results artifact mapping each station to its
//! observed (`qobs`) and simulated (`qsim`) discharge over a daily time index.
//! [`load_results`] picks the artifact from the run's `cfg.json`, and
//! [`consolidate`] reshapes the mapping into one table per quantity.
//!
//! ```rust,no_run
//! use hydro_sweep::results::{consolidate, load_results};
//!
//! # fn main() -> hydro_sweep::Result<()> {
//! let run = load_results("runs/run_2703_1441_seed111")?;
//! if let Some(stations) = run.stations() {
//!     let tables = consolidate(stations)?;
//!     println!("{} days x {} stations", tables.num_rows(), tables.station_ids().len());
//! }
//! # Ok(())
//! # }
//! ```

mod artifact;
mod consolidate;

pub use artifact::{decode_artifact, write_json_artifact, write_parquet_artifact, ArtifactFormat};
pub use consolidate::{consolidate, ConsolidatedTables, DATE_COLUMN};

use crate::experiment::{ArtifactRecord, RunConfig};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Observed and simulated discharge of one station.
///
/// All three columns have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries", into = "RawSeries")]
pub struct StationSeries {
    dates: Vec<NaiveDate>,
    qobs: Vec<Option<f64>>,
    qsim: Vec<Option<f64>>,
}

#[derive(Serialize, Deserialize)]
struct RawSeries {
    date: Vec<NaiveDate>,
    qobs: Vec<Option<f64>>,
    qsim: Vec<Option<f64>>,
}

impl TryFrom<RawSeries> for StationSeries {
    type Error = Error;

    fn try_from(raw: RawSeries) -> Result<Self> {
        Self::new(raw.date, raw.qobs, raw.qsim)
    }
}

impl From<StationSeries> for RawSeries {
    fn from(series: StationSeries) -> Self {
        Self {
            date: series.dates,
            qobs: series.qobs,
            qsim: series.qsim,
        }
    }
}

impl StationSeries {
    /// Create a series from its three columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the column lengths differ
    pub fn new(
        dates: Vec<NaiveDate>,
        qobs: Vec<Option<f64>>,
        qsim: Vec<Option<f64>>,
    ) -> Result<Self> {
        if dates.len() != qobs.len() || dates.len() != qsim.len() {
            return Err(Error::InvalidInput(format!(
                "column lengths differ: date={}, qobs={}, qsim={}",
                dates.len(),
                qobs.len(),
                qsim.len()
            )));
        }
        Ok(Self { dates, qobs, qsim })
    }

    /// Number of time steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if the series has no time steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Time index.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observed discharge.
    #[must_use]
    pub fn qobs(&self) -> &[Option<f64>] {
        &self.qobs
    }

    /// Simulated discharge.
    #[must_use]
    pub fn qsim(&self) -> &[Option<f64>] {
        &self.qsim
    }
}

/// Station id → series mapping, in insertion order.
///
/// Repeated station ids are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationResults {
    stations: Vec<(String, StationSeries)>,
}

impl StationResults {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a station.
    pub fn push(&mut self, station: impl Into<String>, series: StationSeries) {
        self.stations.push((station.into(), series));
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Check if there are no stations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StationSeries)> {
        self.stations.iter().map(|(id, series)| (id.as_str(), series))
    }

    /// Station ids in insertion order.
    #[must_use]
    pub fn station_ids(&self) -> Vec<&str> {
        self.stations.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// First series stored under a station id.
    #[must_use]
    pub fn get(&self, station: &str) -> Option<&StationSeries> {
        self.stations
            .iter()
            .find(|(id, _)| id == station)
            .map(|(_, series)| series)
    }
}

impl FromIterator<(String, StationSeries)> for StationResults {
    fn from_iter<I: IntoIterator<Item = (String, StationSeries)>>(iter: I) -> Self {
        Self {
            stations: iter.into_iter().collect(),
        }
    }
}

impl Serialize for StationResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stations.len()))?;
        for (id, series) in &self.stations {
            map.serialize_entry(id, series)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StationResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct StationsVisitor;

        impl<'de> Visitor<'de> for StationsVisitor {
            type Value = StationResults;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from station id to {date, qobs, qsim}")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut stations = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, series)) = access.next_entry::<String, StationSeries>()? {
                    stations.push((id, series));
                }
                Ok(StationResults { stations })
            }
        }

        deserializer.deserialize_map(StationsVisitor)
    }
}

/// Configuration, artifact, and (when present) results of one run directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResults {
    config: RunConfig,
    artifact: ArtifactRecord,
    stations: Option<StationResults>,
}

impl RunResults {
    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Artifact the configuration selects.
    #[must_use]
    pub const fn artifact(&self) -> &ArtifactRecord {
        &self.artifact
    }

    /// Per-station results, or `None` if the artifact was absent.
    #[must_use]
    pub const fn stations(&self) -> Option<&StationResults> {
        self.stations.as_ref()
    }

    /// Split into configuration and results.
    #[must_use]
    pub fn into_parts(self) -> (RunConfig, Option<StationResults>) {
        (self.config, self.stations)
    }
}

/// Load the per-station results of a run directory.
///
/// The artifact name comes from `cfg.json`: `lstm_no_static_seed{seed}.p` when
/// `no_static`, else `lstm_seed{seed}.p` when `concat_static`, else
/// `ealstm_seed{seed}.p`. A missing artifact is not an error: it is logged and
/// [`RunResults::stations`] returns `None`.
///
/// # Errors
///
/// Returns error if `cfg.json` is missing or malformed, or if the artifact
/// exists but cannot be decoded
pub fn load_results<P: AsRef<Path>>(run_dir: P) -> Result<RunResults> {
    let run_dir = run_dir.as_ref();
    let config = RunConfig::load(run_dir)?;
    let artifact = ArtifactRecord::for_config(run_dir, &config);
    let path = artifact.path();

    if !artifact.exists() {
        warn!("File {} does not exist.", path.display());
        return Ok(RunResults {
            config,
            artifact,
            stations: None,
        });
    }

    let stations = decode_artifact(&path)?;
    info!("Successfully loaded results from {}", path.display());

    Ok(RunResults {
        config,
        artifact,
        stations: Some(stations),
    })
}
