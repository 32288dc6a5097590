//! bridgeindex CLI: scans bridge contract logs into daily aggregates.
//!
//! # Commands
//! ```text
//! bridgeindex scan       [--chain <slug>]... [--start-block N] [--till-block N]
//! bridgeindex status     --chain <slug>
//! bridgeindex aggregates --chain <slug> [--date YYYY-MM-DD]
//! bridgeindex info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bridgeindex_core::{GenesisBlocks, InterfaceCatalog, TopicTable, DEFAULT_MAX_WINDOW};
use bridgeindex_evm::RpcSourceConfig;

mod cmd_inspect;
mod cmd_scan;
mod config;
mod logging;

use config::AppConfig;

#[derive(Parser)]
#[command(
    name = "bridgeindex",
    about = "Bridge log indexer: daily IN/OUT aggregates per chain and asset",
    long_about = "
Scans a bridge contract's transfer events window by window, decodes each one
against the known contract interface versions and folds it into per-day
aggregates in a key-value store. Scans resume from the stored checkpoint.

ENVIRONMENT VARIABLES:
  BRIDGEINDEX_RPC_<CHAIN>    RPC URL for a chain without chains.<chain>.rpc_url
  RUST_LOG                   overrides the config's log directives
",
    version
)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, global = true, default_value = "bridgeindex.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one or more chains up to their current head
    Scan {
        /// Chain slug, repeatable. Default: every configured chain
        #[arg(long = "chain")]
        chains: Vec<String>,
        /// Start here instead of at the stored checkpoint (single chain only)
        #[arg(long)]
        start_block: Option<u64>,
        /// Stop here instead of at the chain head (single chain only)
        #[arg(long)]
        till_block: Option<u64>,
        /// Override the config's max window
        #[arg(long)]
        max_window: Option<u64>,
        /// Print scan reports as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show a chain's stored checkpoint
    Status {
        #[arg(long)]
        chain: String,
    },

    /// List stored daily aggregates for a chain
    Aggregates {
        #[arg(long)]
        chain: String,
        /// Only this UTC date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show built-in defaults, genesis blocks and interface versions
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Info = cli.command {
        return cmd_info();
    }

    let config = AppConfig::load(&cli.config)?;
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Scan {
            chains,
            start_block,
            till_block,
            max_window,
            json,
        } => {
            let args = cmd_scan::ScanArgs {
                chains,
                start_block,
                till_block,
                max_window,
                json,
            };
            cmd_scan::run(&config, args).await
        }

        Commands::Status { chain } => cmd_inspect::status(&config, &chain).await,

        Commands::Aggregates { chain, date, json } => {
            cmd_inspect::aggregates(&config, &chain, date.as_deref(), json).await
        }

        Commands::Info => cmd_info(),
    }
}

fn cmd_info() -> Result<()> {
    let source = RpcSourceConfig::default();
    println!("bridgeindex v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Defaults:");
    println!("  max window            {DEFAULT_MAX_WINDOW} blocks");
    println!("  receipt timeout       {}s", source.receipt_timeout.as_secs());
    println!("  receipt poll interval {}s", source.receipt_poll_interval.as_secs());
    println!("  store                 memory, discarded on exit (set store.kind: sqlite to persist)");
    println!();

    println!("Genesis blocks:");
    for (chain, block) in GenesisBlocks::builtin().entries() {
        println!("  {chain:<12} {block}");
    }
    println!();

    let catalog = InterfaceCatalog::builtin()?;
    let topics = TopicTable::from_catalog(&catalog);
    println!("Interface versions (newest first):");
    for version in catalog.versions() {
        println!("  {}", version.name);
        for event in version.abi.events() {
            let topic = format!("{:#x}", event.selector());
            match topics.direction(&topic) {
                Some(direction) => println!("    {:<3} {} {topic}", direction.to_string(), event.name),
                None => println!("        {} {topic}", event.name),
            }
        }
    }
    Ok(())
}
