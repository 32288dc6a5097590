//! YAML configuration file for the `bridgeindex` binary.
//!
//! ```yaml
//! store:
//!   kind: sqlite
//!   path: ./bridge.db
//! max_window: 5000
//! receipt_timeout_secs: 60
//! request_timeout_secs: 30
//! log:
//!   level: info
//!   components:
//!     bridgeindex-evm: debug
//! chains:
//!   ethereum:
//!     rpc_url: https://eth.example.org
//!     bridge: "0x2796317b0ff8538f253012862c06787adfb8ceb6"
//!     tokens:
//!       "0x0f2d719407fdbeff09d87557abb7232601fd9f29": 18
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bridgeindex_core::{
    BridgeTables, GenesisBlocks, InterfaceCatalog, InterfaceVersion, TokenDecimals, DEFAULT_MAX_WINDOW,
};
use bridgeindex_evm::RpcSourceConfig;
use bridgeindex_storage::StoreConfig;

use crate::logging::LogConfig;

/// Top-level config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chains: BTreeMap<String, ChainConfig>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_max_window")]
    pub max_window: u64,
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Replacement interface versions, newest first. Empty = built-in set.
    #[serde(default)]
    pub interfaces: Vec<InterfaceFile>,
    #[serde(default)]
    pub log: LogConfig,
}

/// One chain's bridge deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Falls back to `BRIDGEINDEX_RPC_<CHAIN>` when omitted.
    #[serde(default)]
    pub rpc_url: Option<String>,
    pub bridge: String,
    /// Overrides the built-in genesis block.
    #[serde(default)]
    pub genesis_block: Option<u64>,
    /// Token address → decimals.
    #[serde(default)]
    pub tokens: BTreeMap<String, u8>,
}

/// An interface version loaded from an ABI JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceFile {
    pub name: String,
    /// Relative paths are resolved against the config file's directory.
    pub abi: PathBuf,
}

fn default_max_window() -> u64 {
    DEFAULT_MAX_WINDOW
}

fn default_receipt_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        let mut config = Self::from_yaml(&raw)
            .with_context(|| format!("parsing config file '{}'", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for iface in &mut config.interfaces {
            if iface.abi.is_relative() {
                iface.abi = base.join(&iface.abi);
            }
        }
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn chain(&self, name: &str) -> Result<&ChainConfig> {
        self.chains
            .get(name)
            .ok_or_else(|| anyhow!("chain '{}' is not configured", name))
    }

    /// The configured RPC URL, or `BRIDGEINDEX_RPC_<CHAIN>` from the environment.
    pub fn rpc_url(&self, chain: &str) -> Result<String> {
        if let Some(url) = &self.chain(chain)?.rpc_url {
            return Ok(url.clone());
        }
        let env_key = format!("BRIDGEINDEX_RPC_{}", chain.to_uppercase().replace('-', "_"));
        std::env::var(&env_key).map_err(|_| {
            anyhow!(
                "no RPC URL for chain '{}'. Set chains.{}.rpc_url or {}",
                chain,
                chain,
                env_key
            )
        })
    }

    /// Set when the configured store drops everything on exit.
    pub fn ephemeral_store_warning(&self) -> Option<&'static str> {
        (!self.store.is_persistent()).then_some(
            "store.kind is memory: aggregates and checkpoints are lost when the process exits; \
             set store.kind: sqlite to keep them",
        )
    }

    pub fn source_config(&self) -> RpcSourceConfig {
        RpcSourceConfig {
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            ..RpcSourceConfig::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Static tables for every configured chain.
    pub fn tables(&self) -> Result<BridgeTables> {
        let catalog = if self.interfaces.is_empty() {
            InterfaceCatalog::builtin()?
        } else {
            let versions = self
                .interfaces
                .iter()
                .map(|iface| -> Result<InterfaceVersion> {
                    let json = std::fs::read_to_string(&iface.abi)
                        .with_context(|| format!("reading ABI file '{}'", iface.abi.display()))?;
                    Ok(InterfaceVersion::from_abi_json(&iface.name, &json)?)
                })
                .collect::<Result<Vec<_>>>()?;
            InterfaceCatalog::new(versions)?
        };

        let mut genesis = GenesisBlocks::builtin();
        let mut tokens = TokenDecimals::new();
        for (name, chain) in &self.chains {
            if let Some(block) = chain.genesis_block {
                genesis = genesis.with(name.clone(), block);
            }
            for (token, decimals) in &chain.tokens {
                tokens.insert(name.clone(), token, *decimals);
            }
        }
        Ok(BridgeTables::from_catalog(catalog, genesis, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
store:
  kind: sqlite
  path: ./bridge.db
max_window: 2000
chains:
  ethereum:
    rpc_url: https://eth.example.org
    bridge: "0x2796317b0fF8538F253012862c06787Adfb8cEb6"
    tokens:
      "0x0F2D719407FdBeFF09D87557AbB7232601FD9F29": 18
  boba:
    bridge: "0x432036208d2717394d2614d6697c46df3ed69540"
    genesis_block: 20000
    tokens:
      "0x96419929d7949d6a801a6909c145c8eef6a40431": 18
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.max_window, 2000);
        assert_eq!(cfg.receipt_timeout_secs, 60);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.store, StoreConfig::Sqlite { path: "./bridge.db".into() });
        assert_eq!(cfg.log, LogConfig::default());
        assert_eq!(cfg.chains.keys().collect::<Vec<_>>(), ["boba", "ethereum"]);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = AppConfig::from_yaml("{}").unwrap();
        assert!(cfg.chains.is_empty());
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.max_window, DEFAULT_MAX_WINDOW);
    }

    #[test]
    fn memory_store_is_flagged() {
        assert!(AppConfig::from_yaml("{}").unwrap().ephemeral_store_warning().is_some());
        assert!(AppConfig::from_yaml(SAMPLE).unwrap().ephemeral_store_warning().is_none());
    }

    #[test]
    fn tables_apply_overrides_and_tokens() {
        let tables = AppConfig::from_yaml(SAMPLE).unwrap().tables().unwrap();
        assert_eq!(tables.genesis.get("boba"), Some(20_000));
        assert_eq!(tables.genesis.get("ethereum"), Some(13_136_427));
        assert_eq!(
            tables.tokens.decimals("ethereum", "0x0f2d719407fdbeff09d87557abb7232601fd9f29"),
            Some(18)
        );
        assert_eq!(tables.catalog.len(), 3);
    }

    #[test]
    fn rpc_url_from_config_or_env() {
        let cfg = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.rpc_url("ethereum").unwrap(), "https://eth.example.org");
        assert!(cfg.rpc_url("fantom").is_err());

        std::env::set_var("BRIDGEINDEX_RPC_BOBA", "https://boba.example.org");
        assert_eq!(cfg.rpc_url("boba").unwrap(), "https://boba.example.org");
    }

    #[test]
    fn interfaces_from_abi_files() {
        let dir = std::env::temp_dir().join(format!("bridgeindex-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let abi = r#"[{"type":"event","name":"TokenDeposit","anonymous":false,"inputs":[
            {"name":"to","type":"address","indexed":true},
            {"name":"chainId","type":"uint256","indexed":false},
            {"name":"token","type":"address","indexed":false},
            {"name":"amount","type":"uint256","indexed":false}]}]"#;
        std::fs::write(dir.join("v2.json"), abi).unwrap();
        std::fs::write(
            dir.join("bridgeindex.yaml"),
            "interfaces:\n  - name: v2\n    abi: v2.json\n",
        )
        .unwrap();

        let cfg = AppConfig::load(&dir.join("bridgeindex.yaml")).unwrap();
        let tables = cfg.tables().unwrap();
        assert_eq!(tables.catalog.current().name, "v2");
        assert_eq!(tables.topics.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_abi_file_is_an_error() {
        let cfg = AppConfig::from_yaml("interfaces:\n  - name: v9\n    abi: /nonexistent/v9.json\n").unwrap();
        assert!(cfg.tables().is_err());
    }
}
