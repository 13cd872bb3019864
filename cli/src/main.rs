//! Tick invocation CLI
//!
//! Seeds the in-memory store from a scenario JSON file and runs proof-mode
//! ticks against it, printing each `TickResult` as JSON. Meant for operators
//! validating a campaign end-to-end without live channel credentials, and
//! for CI smoke runs:
//!
//! ```text
//! campaign-orchestrator tick --scenario demo.json --ticks 3 --batch-size 25
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use campaign_orchestrator_core_rs::{
    Collaborators, EchoRenderer, InMemoryAuditLog, Orchestrator, OrchestratorConfig, Scenario,
    Stores, DEFAULT_BATCH_SIZE,
};

#[derive(Parser)]
#[command(name = "campaign-orchestrator", about = "Campaign distribution orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run proof-mode ticks against a scenario file
    Tick {
        /// Path to the scenario JSON file
        #[arg(long)]
        scenario: PathBuf,

        /// Number of ticks to run
        #[arg(long, default_value_t = 1)]
        ticks: u32,

        /// Maximum leads per tick
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// RFC 3339 timestamp of the first tick (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Tick {
            scenario,
            ticks,
            batch_size,
            at,
        } => {
            let json = std::fs::read_to_string(&scenario)?;
            let scenario = Scenario::from_json(&json)?;
            let now = at.unwrap_or_else(Utc::now);

            let (store, resolver, campaign_id) = scenario.seed(now)?;
            let store = Arc::new(store);
            let audit = Arc::new(InMemoryAuditLog::new());

            let engine = Orchestrator::new(
                OrchestratorConfig::proof("cli-worker"),
                Stores {
                    campaigns: store.clone(),
                    leads: store.clone(),
                    ledger: store.clone(),
                    leases: store.clone(),
                    block_lists: store,
                },
                Collaborators {
                    resolver: Arc::new(resolver),
                    renderer: Arc::new(EchoRenderer),
                    adapter: None,
                    audit: audit.clone(),
                },
            )?;

            info!(%campaign_id, ticks, batch_size, "starting proof run");
            for i in 0..ticks {
                // Ticks one second apart; proof runs do not simulate waiting
                // out sequence delays.
                let tick_at = now + chrono::Duration::seconds(i64::from(i));
                let result = engine.tick(campaign_id, tick_at, batch_size)?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            info!(audit_entries = audit.len(), "proof run complete");
            Ok(())
        }
    }
}
