use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tici_bench::config::HarnessConfig;
use tici_bench::dataset::AcquireOutcome;
use tici_bench::report::RunHistory;
use tici_bench::tasks::Harness;
use tici_bench::util::format_bytes;
use tici_bench::{Result, ASSET_DIR_ENV};

#[derive(Parser, Debug)]
#[command(
    name = "tici-bench",
    version,
    about = "Benchmark harness for TiDB full-text search with TiFlash replicas"
)]
struct Cli {
    /// Asset directory holding the benchmark dataset
    #[arg(long, env = ASSET_DIR_ENV, global = true)]
    asset_dir: Option<PathBuf>,

    /// Alternate config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the asset directory and configure the package mirror
    Setup,
    /// Download and decompress the benchmark dataset (idempotent)
    Install,
    /// Run the benchmark driver in the default configuration
    Test,
    /// Run the benchmark driver with multiple TiFlash replicas
    TestMultiTiflash {
        /// TiFlash instance count (overrides the configured default)
        #[arg(long)]
        tiflash: Option<u32>,
    },
    /// Show recent benchmark runs
    History {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::load()?,
    };

    if let Some(dir) = cli.asset_dir {
        config.asset_dir = dir;
    }
    if let Command::TestMultiTiflash {
        tiflash: Some(count),
    } = &cli.command
    {
        config.multi_tiflash_count = *count;
    }

    match cli.command {
        Command::Setup => Harness::new(config)?.setup().await,
        Command::Install => {
            match Harness::new(config)?.install().await? {
                AcquireOutcome::AlreadyPresent => println!("Dataset already present"),
                AcquireOutcome::Downloaded { dataset_bytes, .. } => {
                    println!("Dataset ready ({})", format_bytes(dataset_bytes))
                }
            }
            Ok(())
        }
        Command::Test => Harness::new(config)?.test().await,
        Command::TestMultiTiflash { .. } => Harness::new(config)?.test_multi_tiflash().await,
        Command::History { limit } => show_history(limit),
    }
}

fn show_history(limit: usize) -> Result<()> {
    let history = RunHistory::new()?;
    let runs = history.recent_runs(limit)?;

    if runs.is_empty() {
        println!("No recorded runs");
        return Ok(());
    }

    for run in runs {
        let elapsed = Duration::from_secs(run.elapsed_secs as u64);
        println!(
            "{}  {:<14} tiflash={} shard={} {} {}",
            run.timestamp.format("%Y-%m-%d %H:%M:%S"),
            run.mode.to_string(),
            run.tiflash_count,
            run.shard_size.as_deref().unwrap_or("-"),
            humantime::format_duration(elapsed),
            if run.success { "ok" } else { "failed" }
        );
    }

    Ok(())
}
