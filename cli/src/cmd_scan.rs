//! `bridgeindex scan`: one scanner per chain, run concurrently.

use anyhow::{bail, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use bridgeindex_core::{BridgeScanner, BridgeTables, KeyValueStore, ScanBuilder, ScanReport};
use bridgeindex_evm::{AbiDecoder, HttpTransport, RpcSource};
use bridgeindex_storage::open_store;

use crate::config::AppConfig;

type EvmScanner = BridgeScanner<RpcSource<HttpTransport>, AbiDecoder>;

/// Command-line overrides for a scan.
#[derive(Debug, Default)]
pub struct ScanArgs {
    /// Chains to scan; empty = every configured chain.
    pub chains: Vec<String>,
    pub start_block: Option<u64>,
    pub till_block: Option<u64>,
    pub max_window: Option<u64>,
    pub json: bool,
}

pub async fn run(config: &AppConfig, args: ScanArgs) -> Result<()> {
    let chains = if args.chains.is_empty() {
        config.chains.keys().cloned().collect::<Vec<_>>()
    } else {
        args.chains.clone()
    };
    if chains.is_empty() {
        bail!("no chains to scan: pass --chain or add chains to the config file");
    }
    if chains.len() > 1 && (args.start_block.is_some() || args.till_block.is_some()) {
        bail!("--start-block and --till-block apply to a single chain");
    }

    if let Some(msg) = config.ephemeral_store_warning() {
        warn!("{msg}");
    }

    let tables = Arc::new(config.tables()?);
    let store = open_store(&config.store).await?;

    let mut outcomes: Vec<(String, Result<ScanReport>)> = Vec::with_capacity(chains.len());
    let mut handles = Vec::new();
    for chain in chains {
        match build_scanner(config, &chain, &args, store.clone(), tables.clone()) {
            Ok(scanner) => {
                let handle = tokio::spawn(async move { scanner.run().await });
                handles.push((chain, handle));
            }
            Err(e) => outcomes.push((chain, Err(e))),
        }
    }

    let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    for (chain, joined) in names.into_iter().zip(join_all(handles).await) {
        let outcome: Result<ScanReport> = match joined {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(anyhow::anyhow!("scan task panicked: {e}")),
        };
        outcomes.push((chain, outcome));
    }

    let mut failed = 0;
    for (chain, outcome) in &outcomes {
        match outcome {
            Ok(report) => print_report(report, args.json)?,
            Err(e) => {
                failed += 1;
                error!(chain = %chain, error = %e, "scan failed");
                eprintln!("{chain}: FAILED: {e:#}");
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} chain scans failed", failed, outcomes.len());
    }
    info!(chains = outcomes.len(), "all scans completed");
    Ok(())
}

fn build_scanner(
    config: &AppConfig,
    chain: &str,
    args: &ScanArgs,
    store: Arc<dyn KeyValueStore>,
    tables: Arc<BridgeTables>,
) -> Result<EvmScanner> {
    let chain_cfg = config.chain(chain)?;
    let transport = HttpTransport::new(config.rpc_url(chain)?, config.request_timeout())?;
    let source = RpcSource::new(transport, config.source_config());

    let mut builder = ScanBuilder::new()
        .chain(chain)
        .bridge(&chain_cfg.bridge)
        .max_window(args.max_window.unwrap_or(config.max_window));
    if let Some(start) = args.start_block {
        builder = builder.start_block(start);
    }
    if let Some(till) = args.till_block {
        builder = builder.till_block(till);
    }
    Ok(builder.build(source, AbiDecoder::new(), store, tables)?)
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    println!(
        "{}: blocks {}..{} in {} windows, {} logs ({} merged, {} skipped on resume)",
        report.chain,
        report.from_block,
        report.till_block,
        report.windows,
        report.logs_seen,
        report.logs_merged,
        report.logs_skipped,
    );
    if let Some((block, tx_index)) = report.last_position {
        println!("  checkpoint: block {block}, tx index {tx_index}");
    }
    Ok(())
}
