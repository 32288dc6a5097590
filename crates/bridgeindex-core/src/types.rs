//! Shared types for the bridge indexing pipeline.

use alloy_primitives::utils::format_units;
use alloy_primitives::U256;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IndexerError;

// ─── Direction ───────────────────────────────────────────────────────────────

/// Which way an asset crosses the bridge, seen from the scanned chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Asset arriving on this chain, submitted by a validator.
    #[serde(rename = "IN")]
    In,
    /// Asset leaving this chain.
    #[serde(rename = "OUT")]
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

// ─── EventLog ────────────────────────────────────────────────────────────────

/// A bridge contract log as returned by a log query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub block_number: u64,
    /// Transaction hash (`0x…`).
    pub tx_hash: String,
    /// Position of the transaction inside its block.
    pub tx_index: u64,
    /// Position of the log inside its block.
    pub log_index: u64,
    /// Topics as lowercase `0x…` hex; `topics[0]` is the event selector.
    pub topics: Vec<String>,
    pub data: Vec<u8>,
}

impl EventLog {
    /// The event selector, if the log has any topics.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }

    /// `(block, tx index)` ordering position of this log.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.tx_index)
    }
}

// ─── Decoded arguments ───────────────────────────────────────────────────────

/// A single decoded event/method argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Lowercase `0x…` address.
    Address(String),
    Uint(U256),
    /// Signed integer, decimal string.
    Int(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// Arrays and tuples, rendered for diagnostics only.
    Other(String),
}

impl ArgValue {
    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(u) => Some(*u),
            _ => None,
        }
    }
}

/// Named arguments recovered from a receipt event or a transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArgs {
    /// Event or method name that matched (e.g. `"TokenDeposit"`, `"mint"`).
    pub name: String,
    /// Interface version that produced the match.
    pub version: String,
    /// Arguments in declaration order.
    pub values: Vec<(String, ArgValue)>,
}

impl DecodedArgs {
    /// Look up an argument by name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Convert raw integer units into human units: `raw / 10^decimals`,
/// rounded once to the nearest f64.
pub fn to_units(raw: U256, decimals: u8) -> Result<f64, IndexerError> {
    let exact = format_units(raw, decimals)
        .map_err(|e| IndexerError::Decode(format!("cannot scale {raw} by {decimals} decimals: {e}")))?;
    exact
        .parse()
        .map_err(|e| IndexerError::Decode(format!("cannot convert {exact} to f64: {e}")))
}

// ─── DecodedTransfer ─────────────────────────────────────────────────────────

/// Gas spent by the validator that submitted an inbound transaction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GasStats {
    /// Gas price in gwei.
    pub gas_price: f64,
    /// Total fee paid in native units (gas used × gas price).
    pub gas_paid: f64,
}

impl GasStats {
    /// Build from wei-denominated receipt values.
    pub fn from_wei(gas_used: u128, gas_price_wei: u128) -> Self {
        Self {
            gas_price: gas_price_wei as f64 / 1e9,
            gas_paid: gas_used.saturating_mul(gas_price_wei) as f64 / 1e18,
        }
    }
}

/// Typed transfer data extracted from one bridge log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTransfer {
    pub direction: Direction,
    /// Lowercase token address.
    pub asset: String,
    /// Decimal-adjusted amount.
    pub amount: f64,
    /// Bridge fee in token units (18-decimal fixed point on chain). Inbound only.
    pub fee: Option<f64>,
    /// Validator gas cost. Inbound only.
    pub validator: Option<GasStats>,
    /// Counterparty chain id when the call/event carries one.
    pub destination: Option<String>,
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Identity of one daily aggregate record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub chain: String,
    /// UTC calendar date of the block that carried the transfer.
    pub date: NaiveDate,
    pub asset: String,
    pub direction: Direction,
    pub destination: Option<String>,
}

impl AggregateKey {
    pub fn new(chain: &str, date: NaiveDate, transfer: &DecodedTransfer) -> Self {
        Self {
            chain: chain.to_string(),
            date,
            asset: transfer.asset.clone(),
            direction: transfer.direction,
            destination: transfer.destination.clone(),
        }
    }

    /// `{chain}:bridge:{date}:{asset}:{direction}[:{destination}]`
    pub fn storage_key(&self) -> String {
        let suffix = self
            .destination
            .as_deref()
            .map(|d| format!(":{d}"))
            .unwrap_or_default();
        format!(
            "{}:bridge:{}:{}:{}{}",
            self.chain,
            self.date.format("%Y-%m-%d"),
            self.asset,
            self.direction,
            suffix
        )
    }

    /// Key prefix shared by all aggregates of a chain.
    pub fn chain_prefix(chain: &str) -> String {
        format!("{chain}:bridge:")
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Cumulative per-day totals for one key.
///
/// `fees` and `validator` exist only on inbound records, and always together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub amount: f64,
    #[serde(rename = "txCount")]
    pub tx_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<GasStats>,
}

impl DailyAggregate {
    /// First observation for a key.
    pub fn from_transfer(key: &AggregateKey, transfer: &DecodedTransfer) -> Result<Self, IndexerError> {
        let mut agg = Self {
            amount: transfer.amount,
            tx_count: 1,
            fees: None,
            validator: None,
        };
        if key.direction == Direction::In {
            let (fee, gas) = inbound_extras(key, transfer)?;
            agg.fees = Some(fee);
            agg.validator = Some(gas);
        }
        Ok(agg)
    }

    /// Fold another observation into this record.
    ///
    /// Nothing is modified when an integrity check fails.
    pub fn absorb(&mut self, key: &AggregateKey, transfer: &DecodedTransfer) -> Result<(), IndexerError> {
        if key.direction == Direction::In {
            let (fee, gas) = inbound_extras(key, transfer)?;
            let (Some(fees), Some(validator)) = (self.fees.as_mut(), self.validator.as_mut()) else {
                return Err(IndexerError::IntegrityMismatch {
                    key: key.storage_key(),
                    reason: format!(
                        "stored IN record has fees = {:?}, validator = {:?}",
                        self.fees, self.validator
                    ),
                });
            };
            *fees += fee;
            validator.gas_price += gas.gas_price;
            validator.gas_paid += gas.gas_paid;
        }
        self.amount += transfer.amount;
        self.tx_count += 1;
        Ok(())
    }
}

fn inbound_extras(key: &AggregateKey, transfer: &DecodedTransfer) -> Result<(f64, GasStats), IndexerError> {
    match (transfer.fee, transfer.validator) {
        (Some(fee), Some(gas)) => Ok((fee, gas)),
        (fee, gas) => Err(IndexerError::IntegrityMismatch {
            key: key.storage_key(),
            reason: format!("incoming IN transfer has fee = {fee:?}, validator = {gas:?}"),
        }),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(amount: f64) -> DecodedTransfer {
        DecodedTransfer {
            direction: Direction::In,
            asset: "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984".into(),
            amount,
            fee: Some(1.0),
            validator: Some(GasStats {
                gas_price: 10.0,
                gas_paid: 21000.0,
            }),
            destination: None,
        }
    }

    fn key_for(t: &DecodedTransfer) -> AggregateKey {
        AggregateKey::new("ethereum", NaiveDate::from_ymd_opt(2021, 11, 3).unwrap(), t)
    }

    #[test]
    fn storage_key_layout() {
        let mut t = inbound(1.0);
        let key = key_for(&t);
        assert_eq!(
            key.storage_key(),
            "ethereum:bridge:2021-11-03:0x1f9840a85d5af5bf1d1762f925bdaddc4201f984:IN"
        );

        t.direction = Direction::Out;
        t.destination = Some("56".into());
        assert!(key_for(&t).storage_key().ends_with(":OUT:56"));
    }

    #[test]
    fn to_units_divides_by_decimals() {
        assert_eq!(to_units(U256::from(1_500_000u64), 6).unwrap(), 1.5);
        assert_eq!(to_units(U256::from(10u64).pow(U256::from(18u64)), 18).unwrap(), 1.0);
    }

    #[test]
    fn to_units_rounds_the_exact_quotient_once() {
        let raw: U256 = "123456789012345678901234567".parse().unwrap();
        let exact: f64 = "123456789.012345678901234567".parse().unwrap();
        assert_eq!(to_units(raw, 18).unwrap(), exact);

        let raw = U256::from(7_777_777_777_777_777_777u128);
        assert_eq!(to_units(raw, 18).unwrap(), "7.777777777777777777".parse::<f64>().unwrap());
        assert_eq!(to_units(U256::from(3u64), 0).unwrap(), 3.0);
    }

    #[test]
    fn to_units_rejects_impossible_decimals() {
        assert!(matches!(to_units(U256::from(1u64), 200), Err(IndexerError::Decode(_))));
    }

    #[test]
    fn gas_stats_from_wei() {
        let gas = GasStats::from_wei(21_000, 50_000_000_000);
        assert_eq!(gas.gas_price, 50.0);
        assert!((gas.gas_paid - 0.00105).abs() < 1e-12);
    }

    #[test]
    fn inbound_absorb_sums_all_fields() {
        let t = inbound(100.0);
        let key = key_for(&t);
        let mut agg = DailyAggregate::from_transfer(&key, &t).unwrap();
        agg.absorb(&key, &t).unwrap();

        assert_eq!(agg.amount, 200.0);
        assert_eq!(agg.tx_count, 2);
        assert_eq!(agg.fees, Some(2.0));
        assert_eq!(
            agg.validator,
            Some(GasStats {
                gas_price: 20.0,
                gas_paid: 42000.0
            })
        );
    }

    #[test]
    fn inbound_absorb_rejects_one_sided_validator() {
        let t = inbound(5.0);
        let key = key_for(&t);
        let mut stored = DailyAggregate {
            amount: 5.0,
            tx_count: 1,
            fees: None,
            validator: None,
        };
        let before = stored.clone();
        assert!(matches!(
            stored.absorb(&key, &t),
            Err(IndexerError::IntegrityMismatch { .. })
        ));
        assert_eq!(stored, before);

        let mut missing_gas = t.clone();
        missing_gas.validator = None;
        let mut agg = DailyAggregate::from_transfer(&key, &t).unwrap();
        assert!(agg.absorb(&key, &missing_gas).is_err());
        assert_eq!(agg.tx_count, 1);
    }

    #[test]
    fn outbound_record_serializes_without_inbound_fields() {
        let mut t = inbound(3.0);
        t.direction = Direction::Out;
        t.fee = None;
        t.validator = None;
        let agg = DailyAggregate::from_transfer(&key_for(&t), &t).unwrap();
        let json = serde_json::to_string(&agg).unwrap();
        assert_eq!(json, r#"{"amount":3.0,"txCount":1}"#);
    }
}
