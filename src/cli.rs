use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::bench::{self, BenchParams};
use crate::config::{Config, CONFIG_PATH_ENV};
use crate::demos::{self, ActivityGauge};
use crate::scheduler::Scheduler;
use crate::types::{val_to_json, TaskError, Val};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - coroutine-driven async task scheduler", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a demo scenario and print its outcome as JSON
    Demo {
        #[command(subcommand)]
        scenario: Scenario,
    },

    /// Run baseline benchmark (concurrent fan-out runs of sleeps)
    Bench {
        /// Number of concurrent runs
        #[arg(long, default_value = "100")]
        runs: usize,

        /// Operations fanned out per run
        #[arg(long, default_value = "10")]
        width: usize,

        /// Milliseconds each operation sleeps
        #[arg(long, default_value = "10")]
        latency_ms: u64,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum Scenario {
    /// Fan out over sleeps plus two immediate values
    FanOut {
        /// Comma-separated sleep latencies in milliseconds
        #[arg(long, value_delimiter = ',', default_value = "10,20,30,40,50")]
        latencies: Vec<u64>,
    },

    /// Fan out over nested coroutines that each return `time * 3`
    Nested {
        /// Comma-separated sleep times in milliseconds
        #[arg(long, value_delimiter = ',', default_value = "10,20,30,40,50")]
        times: Vec<u64>,
    },

    /// Look a key up (only `foo` exists), intercepting failures
    Lookup {
        /// Key to look up
        key: String,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    if let Some(config_path) = &cli.config {
        std::env::set_var(CONFIG_PATH_ENV, config_path);
    }

    // Load and validate configuration before executing any command
    let config = Config::load()?;
    init_logging(&config);

    let scheduler = Scheduler::new(config.scheduler.clone());

    match cli.command {
        Commands::Demo { scenario } => run_demo(scenario, &scheduler).await?,

        Commands::Bench {
            runs,
            width,
            latency_ms,
        } => {
            let params = BenchParams {
                runs,
                width,
                latency_ms,
            };
            bench::run_benchmark(params, &scheduler).await?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_demo(scenario: Scenario, scheduler: &Scheduler) -> Result<()> {
    match scenario {
        Scenario::FanOut { latencies } => {
            let immediate = vec![Val::from(60), Val::from("some text")];
            let start = Instant::now();
            let outcome = scheduler
                .run_async(demos::fan_out_sleeps(latencies, immediate), Vec::new())
                .await;
            print_outcome(outcome)?;
            println!("Elapsed: {}ms", start.elapsed().as_millis());
        }

        Scenario::Nested { times } => {
            let gauge = ActivityGauge::default();
            let start = Instant::now();
            let outcome = scheduler
                .run_async(demos::fan_out_nested(times, gauge.clone()), Vec::new())
                .await;
            print_outcome(outcome)?;
            println!("Elapsed: {}ms", start.elapsed().as_millis());
            println!("Peak concurrency: {}", gauge.peak());
            println!("Still active: {}", gauge.active());
        }

        Scenario::Lookup { key } => {
            let args = vec![Val::from(key)];
            println!("Captured:");
            print_outcome(
                scheduler
                    .run_async(demos::lookup_captured(), args.clone())
                    .await,
            )?;
            println!("Delegated:");
            print_outcome(scheduler.run_async(demos::lookup_delegated(), args).await)?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: Result<Val, TaskError>) -> Result<()> {
    let value = outcome.context("Run failed")?;
    let rendered =
        serde_json::to_string_pretty(&val_to_json(&value)).context("Failed to render result")?;
    println!("{}", rendered);
    Ok(())
}
