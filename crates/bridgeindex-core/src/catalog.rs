//! Immutable lookup tables injected into the scanner at construction:
//! bridge interface versions, the topic → direction table, per-chain genesis
//! blocks, and per-chain token decimals.

use alloy_json_abi::JsonAbi;
use std::collections::{BTreeMap, HashMap};

use crate::error::IndexerError;
use crate::types::Direction;

/// Events emitted when an asset leaves the chain.
const OUT_EVENTS: &[&str] = &[
    "TokenDeposit",
    "TokenRedeem",
    "TokenDepositAndSwap",
    "TokenRedeemAndSwap",
    "TokenRedeemAndRemove",
    "TokenRedeemV2",
];

/// Events emitted when a validator completes an arrival.
const IN_EVENTS: &[&str] = &[
    "TokenWithdraw",
    "TokenMint",
    "TokenMintAndSwap",
    "TokenWithdrawAndRemove",
];

/// Validator entry points; identical across every deployed version.
const VALIDATOR_METHODS: &[&str] = &[
    "function withdraw(address to, address token, uint256 amount, uint256 fee, bytes32 kappa)",
    "function mint(address to, address token, uint256 amount, uint256 fee, bytes32 kappa)",
    "function mintAndSwap(address to, address token, uint256 amount, uint256 fee, address pool, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bytes32 kappa)",
    "function withdrawAndRemove(address to, address token, uint256 amount, uint256 fee, address pool, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bytes32 kappa)",
];

const CURRENT_EVENTS: &[&str] = &[
    "event TokenDeposit(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenRedeem(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenWithdraw(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenMint(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenDepositAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline)",
    "event TokenMintAndSwap(address indexed to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bool swapSuccess, bytes32 indexed kappa)",
    "event TokenRedeemAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline)",
    "event TokenRedeemAndRemove(address indexed to, uint256 chainId, address token, uint256 amount, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline)",
    "event TokenWithdrawAndRemove(address indexed to, address token, uint256 amount, uint256 fee, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bool swapSuccess, bytes32 indexed kappa)",
    "event TokenRedeemV2(bytes32 indexed to, uint256 chainId, address token, uint256 amount)",
];

// No TokenRedeemV2 yet; remove-liquidity redeems carried no deadline.
const LEGACY_EVENTS: &[&str] = &[
    "event TokenDeposit(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenRedeem(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenWithdraw(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenMint(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenDepositAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline)",
    "event TokenMintAndSwap(address indexed to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bool swapSuccess, bytes32 indexed kappa)",
    "event TokenRedeemAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline)",
    "event TokenRedeemAndRemove(address indexed to, uint256 chainId, address token, uint256 amount, uint8 swapTokenIndex, uint256 swapMinAmount)",
    "event TokenWithdrawAndRemove(address indexed to, address token, uint256 amount, uint256 fee, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bool swapSuccess, bytes32 indexed kappa)",
];

// Launch deployment: swap variants without deadlines, no remove-liquidity paths.
const GENESIS_EVENTS: &[&str] = &[
    "event TokenDeposit(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenRedeem(address indexed to, uint256 chainId, address token, uint256 amount)",
    "event TokenWithdraw(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenMint(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa)",
    "event TokenDepositAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy)",
    "event TokenMintAndSwap(address indexed to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, bool swapSuccess, bytes32 indexed kappa)",
];

/// Direction implied by a bridge event name, if it is a transfer event.
pub fn event_direction(name: &str) -> Option<Direction> {
    if OUT_EVENTS.contains(&name) {
        Some(Direction::Out)
    } else if IN_EVENTS.contains(&name) {
        Some(Direction::In)
    } else {
        None
    }
}

// ─── Interface versions ───────────────────────────────────────────────────────

/// One historical bridge contract interface.
#[derive(Debug, Clone)]
pub struct InterfaceVersion {
    /// Label used in logs and errors (e.g. `"current"`).
    pub name: String,
    pub abi: JsonAbi,
}

impl InterfaceVersion {
    pub fn new(name: impl Into<String>, abi: JsonAbi) -> Self {
        Self {
            name: name.into(),
            abi,
        }
    }

    /// Parse a standard Ethereum ABI JSON document.
    pub fn from_abi_json(name: impl Into<String>, json: &str) -> Result<Self, IndexerError> {
        let name = name.into();
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| IndexerError::Config(format!("invalid ABI JSON for '{name}': {e}")))?;
        Ok(Self { name, abi })
    }

    /// Parse human-readable signatures (`"event Foo(address indexed a)"`).
    pub fn from_signatures(name: impl Into<String>, signatures: &[&str]) -> Result<Self, IndexerError> {
        let name = name.into();
        let abi = JsonAbi::parse(signatures.iter().copied())
            .map_err(|e| IndexerError::Config(format!("invalid signature in '{name}': {e}")))?;
        Ok(Self { name, abi })
    }
}

/// Interface versions ordered newest → oldest.
#[derive(Debug, Clone)]
pub struct InterfaceCatalog {
    versions: Vec<InterfaceVersion>,
}

impl InterfaceCatalog {
    /// Build a catalog; the first version is treated as current.
    pub fn new(versions: Vec<InterfaceVersion>) -> Result<Self, IndexerError> {
        if versions.is_empty() {
            return Err(IndexerError::Config("interface catalog is empty".into()));
        }
        Ok(Self { versions })
    }

    /// The three deployed bridge interfaces: `current`, `legacy`, `genesis`.
    pub fn builtin() -> Result<Self, IndexerError> {
        let with_methods = |events: &[&'static str]| -> Vec<&'static str> {
            events.iter().chain(VALIDATOR_METHODS).copied().collect()
        };
        Self::new(vec![
            InterfaceVersion::from_signatures("current", &with_methods(CURRENT_EVENTS))?,
            InterfaceVersion::from_signatures("legacy", &with_methods(LEGACY_EVENTS))?,
            InterfaceVersion::from_signatures("genesis", &with_methods(GENESIS_EVENTS))?,
        ])
    }

    /// The newest interface; the only one inbound calls are decoded against.
    pub fn current(&self) -> &InterfaceVersion {
        &self.versions[0]
    }

    pub fn versions(&self) -> &[InterfaceVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

// ─── TopicTable ──────────────────────────────────────────────────────────────

/// Static `topic0 → Direction` lookup.
#[derive(Debug, Clone, Default)]
pub struct TopicTable {
    entries: BTreeMap<String, Direction>,
}

impl TopicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of the transfer events of every version in the catalog.
    pub fn from_catalog(catalog: &InterfaceCatalog) -> Self {
        let mut table = Self::new();
        for version in catalog.versions() {
            for event in version.abi.events() {
                if let Some(direction) = event_direction(&event.name) {
                    table = table.with(format!("{:#x}", event.selector()), direction);
                }
            }
        }
        table
    }

    /// Add a topic (case-insensitive).
    pub fn with(mut self, topic: impl AsRef<str>, direction: Direction) -> Self {
        self.entries.insert(topic.as_ref().to_ascii_lowercase(), direction);
        self
    }

    pub fn direction(&self, topic: &str) -> Option<Direction> {
        self.entries.get(&topic.to_ascii_lowercase()).copied()
    }

    /// All known topics, used as the log query's topic0 filter.
    pub fn topics(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── GenesisBlocks ───────────────────────────────────────────────────────────

/// First block holding bridge activity, per chain. Scans never start below it.
#[derive(Debug, Clone, Default)]
pub struct GenesisBlocks {
    blocks: HashMap<String, u64>,
}

impl GenesisBlocks {
    pub fn builtin() -> Self {
        Self::default()
            .with("ethereum", 13_136_427)
            .with("arbitrum", 657_404)
            .with("avalanche", 3_376_709)
            .with("bsc", 10_065_475)
            .with("fantom", 18_503_502)
            .with("polygon", 18_026_806)
            .with("harmony", 18_646_320)
            .with("boba", 16_188)
            .with("moonriver", 890_949)
            .with("optimism", 30_718)
    }

    pub fn with(mut self, chain: impl Into<String>, block: u64) -> Self {
        self.blocks.insert(chain.into(), block);
        self
    }

    pub fn get(&self, chain: &str) -> Option<u64> {
        self.blocks.get(chain).copied()
    }

    /// Every `(chain, block)` pair, ordered by chain.
    pub fn entries(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.blocks.iter().map(|(c, b)| (c.as_str(), *b)).collect();
        entries.sort_unstable();
        entries
    }
}

// ─── TokenDecimals ───────────────────────────────────────────────────────────

/// Registered decimal precision per `(chain, token)`.
#[derive(Debug, Clone, Default)]
pub struct TokenDecimals {
    chains: HashMap<String, HashMap<String, u8>>,
}

impl TokenDecimals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, chain: impl Into<String>, token: &str, decimals: u8) -> Self {
        self.insert(chain, token, decimals);
        self
    }

    pub fn insert(&mut self, chain: impl Into<String>, token: &str, decimals: u8) {
        self.chains
            .entry(chain.into())
            .or_default()
            .insert(token.to_ascii_lowercase(), decimals);
    }

    pub fn decimals(&self, chain: &str, token: &str) -> Option<u8> {
        self.chains
            .get(chain)?
            .get(&token.to_ascii_lowercase())
            .copied()
    }
}

// ─── BridgeTables ────────────────────────────────────────────────────────────

/// Everything static a scanner needs, bundled for injection.
#[derive(Debug, Clone)]
pub struct BridgeTables {
    pub catalog: InterfaceCatalog,
    pub topics: TopicTable,
    pub genesis: GenesisBlocks,
    pub tokens: TokenDecimals,
}

impl BridgeTables {
    /// Built-in interfaces and genesis blocks with the given token table.
    pub fn builtin(tokens: TokenDecimals) -> Result<Self, IndexerError> {
        let catalog = InterfaceCatalog::builtin()?;
        Ok(Self::from_catalog(catalog, GenesisBlocks::builtin(), tokens))
    }

    /// Derive the topic table from `catalog`.
    pub fn from_catalog(catalog: InterfaceCatalog, genesis: GenesisBlocks, tokens: TokenDecimals) -> Self {
        let topics = TopicTable::from_catalog(&catalog);
        Self {
            catalog,
            topics,
            genesis,
            tokens,
        }
    }
}
