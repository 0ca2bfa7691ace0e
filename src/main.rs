//! hydro-sweep CLI - seed sweeps and result consolidation for rainfall-runoff LSTMs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hydro_sweep::experiment::{RunRecord, RunStatus};
use hydro_sweep::locate::RunLocator;
use hydro_sweep::sweep::{ProcessExecutor, SweepRunner};
use hydro_sweep::{consolidate, load_results, SweepConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydro-sweep")]
#[command(version)]
#[command(about = "Seed sweeps and result consolidation for rainfall-runoff LSTMs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sweep configuration file
    #[arg(short, long, global = true, default_value = "sweep.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and evaluate every configured seed
    Sweep {
        /// Write the sweep ledger (JSON) here, overriding the configuration
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Print the run directory a seed's training produced
    Locate {
        /// Seed to look up
        #[arg(short, long)]
        seed: u64,

        /// Model name in the run directory (defaults to the configured variant)
        #[arg(short, long, value_parser = ["lstm", "ealstm"])]
        model: Option<String>,
    },

    /// Reshape a run's results into observed/simulated tables
    Consolidate {
        /// Run directory containing cfg.json and the results artifact
        #[arg(short, long)]
        run_dir: PathBuf,

        /// Directory for qobs.parquet and qsim.parquet (defaults to the run directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set subscriber: {e}"))
}

/// Load the configuration, falling back to the reference experiment when the
/// default file is absent.
fn load_config(path: &Path) -> Result<SweepConfig> {
    if !path.exists() {
        warn!(
            "Configuration file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(SweepConfig::default());
    }
    SweepConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn print_example_config() {
    let example = r#"# hydro-sweep configuration file

seeds = [666, 777, 888]
runs_dir = "runs"
# ledger = "runs/sweep.json"

[program]
command = ["python", "main.py"]
camels_root = "data/CAMELS_US"
cache_data = true
no_static = true        # lstm_no_static_seed{seed}.p
concat_static = false   # with no_static = false: true -> lstm, false -> ealstm
# extra_train_args = ["--epochs", "30"]
# working_dir = "/path/to/ealstm"

[locator]
# Exported to training as HYDRO_SWEEP_RUN_DIR_FILE; the program writes its
# run directory into it. Without it the newest matching directory is used.
# handshake_file = "runs/.last_run_dir"
"#;
    println!("{example}");
}

fn print_run(run: &RunRecord) {
    let exit = |code: Option<i32>| code.map_or_else(|| "-".to_string(), |c| c.to_string());
    println!(
        "  seed {:<8} {:<8} train {:<3} evaluate {:<3} {}",
        run.seed(),
        format!("{:?}", run.status()).to_lowercase(),
        exit(run.train_exit()),
        exit(run.evaluate_exit()),
        run.run_dir()
            .map_or_else(String::new, |dir| dir.display().to_string())
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = SweepConfig::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

            info!("Configuration is valid");
            info!("  Seeds: {:?}", config.seeds);
            info!("  Model: {}", config.model_variant());
            info!("  Runs directory: {}", config.resolve(&config.runs_dir).display());
            info!("  Command: {}", config.program.command.join(" "));
        }

        Commands::Sweep { ledger } => {
            let mut config = load_config(&cli.config)?;
            if ledger.is_some() {
                config.ledger = ledger;
            }

            let mut runner = SweepRunner::new(config, ProcessExecutor);
            let store = runner.run();

            println!("\n=== Sweep Complete ===");
            for run in store.runs() {
                print_run(run);
            }
            println!(
                "Succeeded: {}  Failed: {}  Skipped: {}",
                store.count(RunStatus::Success),
                store.count(RunStatus::Failed),
                store.count(RunStatus::Skipped)
            );
        }

        Commands::Locate { seed, model } => {
            let config = load_config(&cli.config)?;
            let model = model.unwrap_or_else(|| config.model_variant().model_name().to_string());

            let locator = RunLocator::from_config(&config);
            let found = locator
                .locate(&model, seed)
                .with_context(|| format!("Failed to scan {}", locator.runs_dir().display()))?;
            match found {
                Some(run_dir) => println!("{}", run_dir.display()),
                None => println!("No run directory found for {model} seed {seed}"),
            }
        }

        Commands::Consolidate { run_dir, output } => {
            let run = load_results(&run_dir)
                .with_context(|| format!("Failed to load results of {}", run_dir.display()))?;

            let Some(stations) = run.stations() else {
                println!(
                    "No results artifact {} in {}; nothing to consolidate",
                    run.artifact().file_name(),
                    run_dir.display()
                );
                return Ok(());
            };

            let tables = consolidate(stations).context("Failed to consolidate results")?;
            let output = output.unwrap_or_else(|| run_dir.clone());
            let (qobs_path, qsim_path) = tables
                .write_parquet(&output)
                .with_context(|| format!("Failed to write tables to {}", output.display()))?;

            println!("\n=== Consolidation Complete ===");
            println!("Seed:      {}", run.config().seed);
            println!("Stations:  {}", tables.station_ids().len());
            println!("Days:      {}", tables.num_rows());
            println!("Observed:  {}", qobs_path.display());
            println!("Simulated: {}", qsim_path.display());
        }
    }

    Ok(())
}
