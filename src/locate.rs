//! Run directory discovery
//!
//! After a training subprocess exits, the sweep needs the directory it wrote.
//! Two strategies are tried in order:
//!
//! 1. **Handshake**: the training program is told (via [`RUN_DIR_ENV`]) where
//!    to write the path of its run directory. If that file names an existing
//!    directory, it is used as-is.
//! 2. **Latest match**: the direct children of the runs directory whose name
//!    matches `run_{model}*_seed{seed}` are compared by modification time and
//!    the newest one wins. Ties are broken arbitrarily.

use crate::config::SweepConfig;
use crate::{Error, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Environment variable carrying the handshake file path to the training program.
pub const RUN_DIR_ENV: &str = "HYDRO_SWEEP_RUN_DIR_FILE";

/// Glob pattern (basename only) of run directories for a model and seed.
#[must_use]
pub fn run_dir_pattern(model_name: &str, seed: u64) -> String {
    format!("run_{}*_seed{seed}", Pattern::escape(model_name))
}

/// Finds the run directory produced by a training invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLocator {
    runs_dir: PathBuf,
    handshake_file: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl RunLocator {
    /// Locator scanning `runs_dir`, with no handshake file.
    #[must_use]
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs_dir: runs_dir.into(),
            handshake_file: None,
            working_dir: None,
        }
    }

    /// Locator built from a sweep configuration.
    ///
    /// Relative paths are resolved against the program working directory.
    #[must_use]
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            runs_dir: config.resolve(&config.runs_dir),
            handshake_file: config
                .locator
                .handshake_file
                .as_deref()
                .map(|file| config.resolve(file)),
            working_dir: config.program.working_dir.clone(),
        }
    }

    /// Enable the handshake file.
    #[must_use]
    pub fn with_handshake(mut self, file: impl Into<PathBuf>) -> Self {
        self.handshake_file = Some(file.into());
        self
    }

    /// Get the runs directory.
    #[must_use]
    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Get the handshake file, if enabled.
    #[must_use]
    pub fn handshake_file(&self) -> Option<&Path> {
        self.handshake_file.as_deref()
    }

    /// Remove a stale handshake file so an old run is never picked up.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be removed
    pub fn prepare(&self) -> Result<()> {
        if let Some(file) = &self.handshake_file {
            match std::fs::remove_file(file) {
                Ok(()) => debug!("Removed stale handshake file {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    /// Locate the run directory for a model and seed.
    ///
    /// Returns `Ok(None)` when neither strategy finds a directory.
    ///
    /// # Errors
    ///
    /// Returns error if the runs directory cannot be listed
    pub fn locate(&self, model_name: &str, seed: u64) -> Result<Option<PathBuf>> {
        if let Some(run_dir) = self.read_handshake() {
            debug!("Run directory for seed {seed} taken from handshake file");
            return Ok(Some(run_dir));
        }
        self.find_latest(model_name, seed)
    }

    /// Read the handshake file, if enabled and valid.
    #[must_use]
    pub fn read_handshake(&self) -> Option<PathBuf> {
        let file = self.handshake_file.as_ref()?;
        let content = std::fs::read_to_string(file).ok()?;
        let line = content.lines().next()?.trim();
        if line.is_empty() {
            return None;
        }

        let path = Path::new(line);
        let run_dir = match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };

        if run_dir.is_dir() {
            Some(run_dir)
        } else {
            warn!(
                "Handshake file {} names {}, which is not a directory",
                file.display(),
                run_dir.display()
            );
            None
        }
    }

    /// Most recently modified directory matching `run_{model}*_seed{seed}`.
    ///
    /// Only direct children of the runs directory are considered. Symlinks
    /// to directories count and are compared by their target's mtime;
    /// dangling links are ignored. A missing runs directory yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns error if the runs directory or an entry's metadata cannot be read
    pub fn find_latest(&self, model_name: &str, seed: u64) -> Result<Option<PathBuf>> {
        let pattern_str = run_dir_pattern(model_name, seed);
        let pattern = Pattern::new(&pattern_str)
            .map_err(|e| Error::Pattern(format!("{pattern_str}: {e}")))?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let entries = match std::fs::read_dir(&self.runs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Runs directory {} does not exist", self.runs_dir.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !pattern.matches_with(name, options) {
                continue;
            }
            let path = self.runs_dir.join(name);
            if path.is_dir() {
                debug!("Candidate run directory {name}");
                candidates.push(path);
            }
        }

        latest_modified(candidates)
    }
}

/// Pick the path with the latest modification time.
///
/// Names play no part in the choice; ties are broken arbitrarily.
///
/// # Errors
///
/// Returns error if a path's metadata cannot be read
pub fn latest_modified<I>(paths: I) -> Result<Option<PathBuf>>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for path in paths {
        let modified = std::fs::metadata(&path)?.modified()?;
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch_dir(root: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = root.join(name);
        std::fs::create_dir(&path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::open(&path).unwrap().set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn test_pattern() {
        assert_eq!(run_dir_pattern("lstm", 5), "run_lstm*_seed5");
        assert_eq!(run_dir_pattern("ealstm", 666), "run_ealstm*_seed666");
    }

    #[test]
    fn test_newest_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch_dir(dir.path(), "run_lstm_0101_1200_seed5", 600);
        let newest = touch_dir(dir.path(), "run_lstm_0202_0900_seed5", 5);

        let locator = RunLocator::new(dir.path());
        assert_eq!(locator.find_latest("lstm", 5).unwrap(), Some(newest));
    }

    #[test]
    fn test_latest_modified_ignores_names() {
        let dir = tempfile::tempdir().unwrap();
        let older = touch_dir(dir.path(), "run_lstm_seed5_a", 600);
        let newer = touch_dir(dir.path(), "run_lstm_seed5_b", 10);

        assert_eq!(latest_modified([older.clone(), newer.clone()]).unwrap(), Some(newer.clone()));
        assert_eq!(latest_modified([newer.clone(), older]).unwrap(), Some(newer));
        assert_eq!(latest_modified(Vec::<PathBuf>::new()).unwrap(), None);
    }

    #[test]
    fn test_other_seeds_and_models_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch_dir(dir.path(), "run_lstm_0101_seed55", 1);
        touch_dir(dir.path(), "run_ealstm_0101_seed5", 1);
        let expected = touch_dir(dir.path(), "run_lstm_0101_seed5", 100);

        let locator = RunLocator::new(dir.path());
        assert_eq!(locator.find_latest("lstm", 5).unwrap(), Some(expected));
    }

    #[test]
    fn test_files_are_not_run_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run_lstm_x_seed5"), b"").unwrap();

        let locator = RunLocator::new(dir.path());
        assert_eq!(locator.find_latest("lstm", 5).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_run_directory_found() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        std::fs::create_dir(&runs).unwrap();
        touch_dir(&runs, "run_lstm_0101_seed5", 3600);
        let target = touch_dir(dir.path(), "scratch_run", 1);
        let link = runs.join("run_lstm_link_seed5");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), runs.join("run_lstm_dead_seed5"))
            .unwrap();

        let locator = RunLocator::new(&runs);
        assert_eq!(locator.find_latest("lstm", 5).unwrap(), Some(link));
    }

    #[test]
    fn test_missing_runs_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let locator = RunLocator::new(dir.path().join("runs"));
        assert_eq!(locator.locate("lstm", 5).unwrap(), None);
    }

    #[test]
    fn test_handshake_wins_over_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let chosen = touch_dir(dir.path(), "run_lstm_0101_seed7", 1000);
        touch_dir(dir.path(), "run_lstm_0202_seed7", 1);

        let handshake = dir.path().join("last_run.txt");
        std::fs::write(&handshake, format!("{}\n", chosen.display())).unwrap();

        let locator = RunLocator::new(dir.path()).with_handshake(&handshake);
        assert_eq!(locator.locate("lstm", 7).unwrap(), Some(chosen));

        locator.prepare().unwrap();
        assert!(!handshake.exists());
        // Nothing to remove the second time
        locator.prepare().unwrap();
    }

    #[test]
    fn test_handshake_to_missing_dir_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let latest = touch_dir(dir.path(), "run_lstm_0101_seed7", 1);

        let handshake = dir.path().join("last_run.txt");
        std::fs::write(&handshake, "/nonexistent/run_dir").unwrap();

        let locator = RunLocator::new(dir.path()).with_handshake(&handshake);
        assert_eq!(locator.locate("lstm", 7).unwrap(), Some(latest));
    }
}
