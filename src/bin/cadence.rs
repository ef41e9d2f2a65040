//! Cadence CLI
//!
//! Runs demo scenarios and a baseline benchmark against the scheduler, and
//! prints the effective configuration.

use cadence_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
