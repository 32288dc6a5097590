//! Converts alloy `DynSolValue` into the pipeline's [`ArgValue`].

use alloy_core::dyn_abi::DynSolValue;
use bridgeindex_core::ArgValue;

/// Convert a decoded `DynSolValue` into an [`ArgValue`].
pub fn normalize(val: DynSolValue) -> ArgValue {
    match val {
        DynSolValue::Bool(b) => ArgValue::Bool(b),
        DynSolValue::Int(i, _bits) => ArgValue::Int(i.to_string()),
        DynSolValue::Uint(u, _bits) => ArgValue::Uint(u),
        // Left-aligned in a 32-byte word.
        DynSolValue::FixedBytes(word, size) => ArgValue::Bytes(word[..size].to_vec()),
        DynSolValue::Bytes(b) => ArgValue::Bytes(b),
        DynSolValue::String(s) => ArgValue::Str(s),
        DynSolValue::Address(a) => ArgValue::Address(format!("{a:#x}")),
        other => ArgValue::Other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};

    #[test]
    fn normalize_uint256() {
        let v = normalize(DynSolValue::Uint(U256::from(42u64), 256));
        assert_eq!(v, ArgValue::Uint(U256::from(42u64)));
    }

    #[test]
    fn normalize_address_is_lowercase() {
        let addr: Address = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".parse().unwrap();
        let v = normalize(DynSolValue::Address(addr));
        assert_eq!(v, ArgValue::Address("0xd8da6bf26964af9d7eed9e03e53415d37aa96045".into()));
    }

    #[test]
    fn normalize_short_fixed_bytes() {
        let mut word = B256::ZERO;
        word[0] = 0xab;
        word[1] = 0xcd;
        assert_eq!(normalize(DynSolValue::FixedBytes(word, 2)), ArgValue::Bytes(vec![0xab, 0xcd]));
    }

    #[test]
    fn arrays_are_opaque() {
        let v = normalize(DynSolValue::Array(vec![DynSolValue::Bool(true)]));
        assert!(matches!(v, ArgValue::Other(_)));
    }
}
