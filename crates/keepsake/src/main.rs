//! Keepsake operator binary.
//!
//! Inspects and maintains the ledger that tracks media through the lifecycle:
//! - Create or migrate the ledger
//! - Summarize stages and recent passes
//! - Inspect, list and release quarantined records
//! - Back the ledger up

use clap::Parser;
use keepsake::PipelineConfig;
use keepsake::cli::{Cli, execute};
use keepsake::observability::{
    ObservabilityConfig, init_observability_with_config, shutdown_observability,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // KEEPSAKE_CONFIG and KEEPSAKE__* overrides may come from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)?;

    let mut observability = ObservabilityConfig::from_logging(config.logging());
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability_with_config(observability)?;

    let result = execute(&cli.command, &config, cli.format).await;
    shutdown_observability();

    println!("{}", result?);
    Ok(())
}
