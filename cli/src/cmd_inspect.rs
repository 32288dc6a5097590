//! `bridgeindex status` and `bridgeindex aggregates`: read-only views of the store.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use bridgeindex_core::{AggregateStore, CheckpointStore};
use bridgeindex_storage::open_store;

use crate::config::AppConfig;

pub async fn status(config: &AppConfig, chain: &str) -> Result<()> {
    let bridge = config.chain(chain)?.bridge.to_ascii_lowercase();
    warn_if_ephemeral(config);
    let store = open_store(&config.store).await?;
    let checkpoints = CheckpointStore::new(store, chain, &bridge);

    println!("{chain} bridge {bridge}");
    match checkpoints.load().await? {
        Some(cp) => {
            println!("  {} = {}", checkpoints.block_key(), cp.block_number);
            match cp.tx_index {
                Some(idx) => println!("  {} = {}", checkpoints.index_key(), idx),
                None => println!("  {} (not stored)", checkpoints.index_key()),
            }
        }
        None => println!("  no checkpoint stored; the next scan starts at the genesis block"),
    }
    Ok(())
}

pub async fn aggregates(config: &AppConfig, chain: &str, date: Option<&str>, json: bool) -> Result<()> {
    if let Some(d) = date {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").with_context(|| format!("invalid date '{d}', expected YYYY-MM-DD"))?;
    }
    warn_if_ephemeral(config);
    let store = open_store(&config.store).await?;
    let records = AggregateStore::new(store).list(chain, date).await?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = records
            .into_iter()
            .map(|(k, v)| -> Result<_> { Ok((k, serde_json::to_value(v)?)) })
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no aggregates stored for {chain}");
        return Ok(());
    }
    for (key, agg) in &records {
        print!("{key}  amount={} txCount={}", agg.amount, agg.tx_count);
        if let (Some(fees), Some(gas)) = (agg.fees, &agg.validator) {
            print!(" fees={fees} gas_price={} gas_paid={}", gas.gas_price, gas.gas_paid);
        }
        println!();
    }
    println!("{} records", records.len());
    Ok(())
}

/// A fresh memory store is always empty; say so instead of printing nothing.
fn warn_if_ephemeral(config: &AppConfig) {
    if let Some(msg) = config.ephemeral_store_warning() {
        eprintln!("warning: {msg}");
    }
}
