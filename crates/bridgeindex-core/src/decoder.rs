//! Argument decoder: turns a classified bridge log into a [`DecodedTransfer`].
//!
//! # Outbound
//! Asset and amount live in the event arguments. The receipt is decoded
//! against each interface version in catalog order (newest first); the first
//! version that recognizes an event wins. Exhausting the catalog is fatal.
//!
//! # Inbound
//! Asset, amount and fee live in the validator's call input, decoded against
//! the current interface only. The validator's gas cost comes from the
//! receipt.

use std::sync::Arc;

use crate::catalog::{BridgeTables, InterfaceVersion};
use crate::error::IndexerError;
use crate::source::{ChainSource, TxInfo, TxReceipt};
use crate::types::{to_units, ArgValue, DecodedArgs, DecodedTransfer, Direction, EventLog, GasStats};

/// Bridge fees are always 18-decimal fixed point, whatever the token.
const FEE_DECIMALS: u8 = 18;

/// Decodes receipts and call inputs against a single interface version.
///
/// `Ok(None)` means "this version does not recognize the data"; `Err` is
/// reserved for data that cannot be decoded by any version (malformed hex,
/// truncated input).
pub trait InterfaceDecoder: Send + Sync {
    /// Find and decode the first event emitted by `contract` in `receipt`
    /// that `version` declares.
    fn decode_receipt(
        &self,
        receipt: &TxReceipt,
        contract: &str,
        version: &InterfaceVersion,
    ) -> Result<Option<DecodedArgs>, IndexerError>;

    /// Decode call input (selector included) against `version`'s methods.
    fn decode_input(&self, input: &[u8], version: &InterfaceVersion) -> Result<Option<DecodedArgs>, IndexerError>;
}

impl<T: InterfaceDecoder + ?Sized> InterfaceDecoder for Arc<T> {
    fn decode_receipt(
        &self,
        receipt: &TxReceipt,
        contract: &str,
        version: &InterfaceVersion,
    ) -> Result<Option<DecodedArgs>, IndexerError> {
        (**self).decode_receipt(receipt, contract, version)
    }

    fn decode_input(&self, input: &[u8], version: &InterfaceVersion) -> Result<Option<DecodedArgs>, IndexerError> {
        (**self).decode_input(input, version)
    }
}

/// Direction-aware transfer extraction on top of an [`InterfaceDecoder`].
pub struct ArgumentDecoder<D> {
    decoder: D,
    tables: Arc<BridgeTables>,
}

impl<D: InterfaceDecoder> ArgumentDecoder<D> {
    pub fn new(decoder: D, tables: Arc<BridgeTables>) -> Self {
        Self { decoder, tables }
    }

    pub fn inner(&self) -> &D {
        &self.decoder
    }

    /// Fetch whatever `direction` needs from `source` and decode `log`.
    pub async fn decode<S: ChainSource + ?Sized>(
        &self,
        source: &S,
        chain: &str,
        bridge: &str,
        direction: Direction,
        log: &EventLog,
    ) -> Result<DecodedTransfer, IndexerError> {
        let receipt = source.receipt(&log.tx_hash).await?;
        match direction {
            Direction::Out => {
                let args = self.decode_outbound(chain, bridge, &receipt)?;
                self.extract(chain, &log.tx_hash, Direction::Out, &args, None)
            }
            Direction::In => {
                let tx = source.transaction(&log.tx_hash).await?;
                let args = self.decode_inbound(chain, &tx)?;
                let gas = validator_gas(&receipt, &tx)?;
                self.extract(chain, &log.tx_hash, Direction::In, &args, Some(gas))
            }
        }
    }

    /// Try each interface version, newest first, until one recognizes the receipt.
    pub fn decode_outbound(&self, chain: &str, bridge: &str, receipt: &TxReceipt) -> Result<DecodedArgs, IndexerError> {
        let mut tried = Vec::with_capacity(self.tables.catalog.len());
        for version in self.tables.catalog.versions() {
            if let Some(args) = self.decoder.decode_receipt(receipt, bridge, version)? {
                return Ok(args);
            }
            tracing::debug!(
                chain,
                tx_hash = %receipt.tx_hash,
                version = %version.name,
                "receipt not recognized, falling back to older interface"
            );
            tried.push(version.name.as_str());
        }
        Err(IndexerError::InterfacesExhausted {
            chain: chain.to_string(),
            tx_hash: receipt.tx_hash.clone(),
            tried: tried.join(", "),
        })
    }

    /// Inbound calls only ever come from the current validator, so there is
    /// no fallback.
    pub fn decode_inbound(&self, chain: &str, tx: &TxInfo) -> Result<DecodedArgs, IndexerError> {
        let current = self.tables.catalog.current();
        self.decoder
            .decode_input(&tx.input, current)?
            .ok_or_else(|| IndexerError::UnrecognizedCall {
                chain: chain.to_string(),
                tx_hash: tx.tx_hash.clone(),
                version: current.name.clone(),
            })
    }

    fn extract(
        &self,
        chain: &str,
        tx_hash: &str,
        direction: Direction,
        args: &DecodedArgs,
        validator: Option<GasStats>,
    ) -> Result<DecodedTransfer, IndexerError> {
        let asset = args
            .get("token")
            .and_then(ArgValue::as_address)
            .ok_or_else(|| IndexerError::MissingToken {
                chain: chain.to_string(),
                tx_hash: tx_hash.to_string(),
            })?
            .to_ascii_lowercase();

        let decimals = self
            .tables
            .tokens
            .decimals(chain, &asset)
            .ok_or_else(|| IndexerError::UnknownAsset {
                chain: chain.to_string(),
                asset: asset.clone(),
                tx_hash: tx_hash.to_string(),
            })?;

        let amount = to_units(uint_arg(args, "amount", tx_hash)?, decimals)?;
        let destination = args
            .get("chainId")
            .and_then(ArgValue::as_uint)
            .map(|id| id.to_string());

        let mut transfer = DecodedTransfer {
            direction,
            asset,
            amount,
            fee: None,
            validator: None,
            destination,
        };
        if direction == Direction::In {
            transfer.fee = Some(to_units(uint_arg(args, "fee", tx_hash)?, FEE_DECIMALS)?);
            transfer.validator = validator;
        }
        Ok(transfer)
    }
}

fn uint_arg(args: &DecodedArgs, name: &str, tx_hash: &str) -> Result<alloy_primitives::U256, IndexerError> {
    args.get(name)
        .and_then(ArgValue::as_uint)
        .ok_or_else(|| IndexerError::MissingArgument {
            name: name.to_string(),
            tx_hash: tx_hash.to_string(),
        })
}

/// Gas cost of an inbound transaction, charged to the submitting validator.
fn validator_gas(receipt: &TxReceipt, tx: &TxInfo) -> Result<GasStats, IndexerError> {
    let price = receipt
        .effective_gas_price
        .or(tx.gas_price)
        .ok_or_else(|| IndexerError::Rpc(format!("no gas price for tx {}", tx.tx_hash)))?;
    Ok(GasStats::from_wei(receipt.gas_used, price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GenesisBlocks, InterfaceCatalog, TokenDecimals};
    use alloy_primitives::U256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const TOKEN: &str = "0x0f2d719407fdbeff09d87557abb7232601fd9f29";
    const BRIDGE: &str = "0x2796317b0ff8538f253012862c06787adfb8ceb6";

    /// Recognizes receipts only under the named version.
    struct OnlyVersion {
        accepts: &'static str,
        args: Vec<(String, ArgValue)>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl OnlyVersion {
        fn new(accepts: &'static str, args: Vec<(String, ArgValue)>) -> Self {
            Self {
                accepts,
                args,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(vec![]),
            }
        }

        fn hit(&self, version: &InterfaceVersion) -> Option<DecodedArgs> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(version.name.clone());
            (version.name == self.accepts).then(|| DecodedArgs {
                name: "TokenDeposit".into(),
                version: version.name.clone(),
                values: self.args.clone(),
            })
        }
    }

    impl InterfaceDecoder for OnlyVersion {
        fn decode_receipt(
            &self,
            _receipt: &TxReceipt,
            _contract: &str,
            version: &InterfaceVersion,
        ) -> Result<Option<DecodedArgs>, IndexerError> {
            Ok(self.hit(version))
        }

        fn decode_input(&self, _input: &[u8], version: &InterfaceVersion) -> Result<Option<DecodedArgs>, IndexerError> {
            Ok(self.hit(version))
        }
    }

    fn tables() -> Arc<BridgeTables> {
        Arc::new(BridgeTables::from_catalog(
            InterfaceCatalog::builtin().unwrap(),
            GenesisBlocks::builtin(),
            TokenDecimals::new().with("ethereum", TOKEN, 18),
        ))
    }

    fn receipt() -> TxReceipt {
        TxReceipt {
            tx_hash: "0x01".into(),
            block_number: 13_200_000,
            gas_used: 21_000,
            effective_gas_price: Some(10_000_000_000),
            logs: vec![],
        }
    }

    fn deposit_args(token: &str) -> Vec<(String, ArgValue)> {
        vec![
            ("to".into(), ArgValue::Address("0x00000000000000000000000000000000000000aa".into())),
            ("chainId".into(), ArgValue::Uint(U256::from(56u64))),
            ("token".into(), ArgValue::Address(token.into())),
            ("amount".into(), ArgValue::Uint(U256::from(2_500_000_000_000_000_000u128))),
        ]
    }

    #[test]
    fn current_match_skips_older_versions() {
        let dec = ArgumentDecoder::new(OnlyVersion::new("current", deposit_args(TOKEN)), tables());
        let args = dec.decode_outbound("ethereum", BRIDGE, &receipt()).unwrap();
        assert_eq!(args.version, "current");
        assert_eq!(dec.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallback_walks_versions_in_order() {
        let dec = ArgumentDecoder::new(OnlyVersion::new("genesis", deposit_args(TOKEN)), tables());
        let args = dec.decode_outbound("ethereum", BRIDGE, &receipt()).unwrap();
        assert_eq!(args.version, "genesis");
        assert_eq!(*dec.inner().seen.lock().unwrap(), ["current", "legacy", "genesis"]);
    }

    #[test]
    fn exhausted_catalog_is_fatal() {
        let dec = ArgumentDecoder::new(OnlyVersion::new("none", deposit_args(TOKEN)), tables());
        match dec.decode_outbound("ethereum", BRIDGE, &receipt()).unwrap_err() {
            IndexerError::InterfacesExhausted { tried, .. } => {
                assert_eq!(tried, "current, legacy, genesis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn outbound_extraction_normalizes_amount_and_destination() {
        let dec = ArgumentDecoder::new(OnlyVersion::new("current", deposit_args(&TOKEN.to_uppercase().replace("0X", "0x"))), tables());
        let args = dec.decode_outbound("ethereum", BRIDGE, &receipt()).unwrap();
        let t = dec.extract("ethereum", "0x01", Direction::Out, &args, None).unwrap();
        assert_eq!(t.asset, TOKEN);
        assert_eq!(t.amount, 2.5);
        assert_eq!(t.destination.as_deref(), Some("56"));
        assert!(t.fee.is_none() && t.validator.is_none());
    }

    #[test]
    fn missing_token_and_unknown_asset() {
        let mut no_token = deposit_args(TOKEN);
        no_token.retain(|(n, _)| n != "token");
        let dec = ArgumentDecoder::new(OnlyVersion::new("current", no_token), tables());
        let args = dec.decode_outbound("ethereum", BRIDGE, &receipt()).unwrap();
        assert!(matches!(
            dec.extract("ethereum", "0x01", Direction::Out, &args, None),
            Err(IndexerError::MissingToken { .. })
        ));

        let dec = ArgumentDecoder::new(OnlyVersion::new("current", deposit_args(TOKEN)), tables());
        let args = dec.decode_outbound("bsc", BRIDGE, &receipt()).unwrap();
        assert!(matches!(
            dec.extract("bsc", "0x01", Direction::Out, &args, None),
            Err(IndexerError::UnknownAsset { .. })
        ));
    }

    #[test]
    fn inbound_uses_current_version_only() {
        let dec = ArgumentDecoder::new(OnlyVersion::new("legacy", deposit_args(TOKEN)), tables());
        let tx = TxInfo {
            tx_hash: "0x02".into(),
            input: vec![0, 1, 2, 3],
            gas_price: None,
        };
        assert!(matches!(
            dec.decode_inbound("ethereum", &tx),
            Err(IndexerError::UnrecognizedCall { .. })
        ));
        assert_eq!(dec.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inbound_fee_is_18_decimals() {
        let args = DecodedArgs {
            name: "mint".into(),
            version: "current".into(),
            values: vec![
                ("token".into(), ArgValue::Address(TOKEN.into())),
                ("amount".into(), ArgValue::Uint(U256::from(100_000_000_000_000_000_000u128))),
                ("fee".into(), ArgValue::Uint(U256::from(1_000_000_000_000_000_000u128))),
            ],
        };
        let dec = ArgumentDecoder::new(OnlyVersion::new("current", vec![]), tables());
        let gas = GasStats::from_wei(21_000, 10_000_000_000);
        let t = dec.extract("ethereum", "0x03", Direction::In, &args, Some(gas)).unwrap();
        assert_eq!(t.amount, 100.0);
        assert_eq!(t.fee, Some(1.0));
        assert_eq!(t.validator, Some(gas));
        assert!(t.destination.is_none());
    }

    #[test]
    fn validator_gas_prefers_effective_price() {
        let tx = TxInfo {
            tx_hash: "0x04".into(),
            input: vec![],
            gas_price: Some(1),
        };
        let gas = validator_gas(&receipt(), &tx).unwrap();
        assert_eq!(gas.gas_price, 10.0);

        let mut legacy = receipt();
        legacy.effective_gas_price = None;
        assert_eq!(validator_gas(&legacy, &tx).unwrap().gas_price, 1e-9);
    }
}
