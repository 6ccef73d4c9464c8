//! Chronicle CLI
//!
//! Reconstructs the activity feed for a cluster of application contracts
//! and prints it as pretty JSON.

use anyhow::{Context, Result};
use chronicle::describe::CallScriptDescriber;
use chronicle::directory::FileDirectory;
use chronicle::feed::{ActivityFeed, SyncTrigger};
use chronicle::rpc::LedgerClient;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Activity feed reconstruction tool
#[derive(Parser)]
#[command(name = "chronicle")]
#[command(about = "Reconstruct the activity feed of an application cluster from ledger data")]
struct Args {
    /// RPC endpoint URL (e.g., https://eth.llamarpc.com)
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Path to the cluster address file (one address per line)
    #[arg(short, long, default_value = "apps.txt")]
    apps: PathBuf,

    /// Block to start the log scan from
    #[arg(short, long, default_value_t = 0)]
    from_block: u64,

    /// Maximum concurrent RPC calls per stage
    #[arg(short, long, default_value_t = 8)]
    max_concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    info!("RPC URL: {}", args.rpc_url);
    info!("Address file: {:?}", args.apps);

    let feed = ActivityFeed::new(
        FileDirectory::new(args.apps),
        LedgerClient::new(args.rpc_url),
        CallScriptDescriber::new(),
    )
    .with_from_block(args.from_block)
    .with_max_concurrency(args.max_concurrency);

    let activities = feed
        .resync(SyncTrigger::Manual)
        .await
        .context("Failed to reconstruct activity feed")?;

    info!("Reconstructed {} activities", activities.len());
    println!("{}", serde_json::to_string_pretty(&activities)?);

    Ok(())
}
