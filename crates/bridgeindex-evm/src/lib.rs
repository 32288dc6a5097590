//! bridgeindex-evm: EVM implementations of the bridgeindex-core seams.
//!
//! - [`RpcSource`] fetches heads, block times, log windows, receipts and
//!   transactions over JSON-RPC ([`HttpTransport`] in production).
//! - [`AbiDecoder`] decodes receipts and call input against an
//!   [`InterfaceVersion`](bridgeindex_core::InterfaceVersion) with alloy.

pub mod abi;
pub mod fetcher;
pub mod normalizer;
pub mod rpc;

pub use abi::AbiDecoder;
pub use fetcher::{RpcSource, RpcSourceConfig};
pub use rpc::{HttpTransport, RpcTransport};
