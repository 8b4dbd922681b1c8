//! Unsigned little-endian big-integer convention.
//!
//! The legacy wire protocol encodes every arbitrary-precision value as an
//! unsigned little-endian byte sequence. Hash operands additionally use the
//! *minimal* encoding (trailing zero bytes stripped), which is what the
//! server's own big-integer round-trips produce. Centralizing both forms
//! here means the convention is asserted once instead of at every call site.

use num_bigint::BigUint;

/// Decode an unsigned little-endian byte sequence.
pub fn from_le(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

/// Minimal unsigned little-endian encoding, as used for hash operands.
/// Zero encodes as a single `0x00` byte.
pub fn to_le(value: &BigUint) -> Vec<u8> {
    value.to_bytes_le()
}

/// Fixed-width unsigned little-endian encoding, zero-padded at the high end.
///
/// Used where the protocol implies a field width (public ephemerals and the
/// shared secret are 32 bytes). Values wider than `N` are truncated to the
/// low `N` bytes, matching the fixed-size wire fields.
pub fn to_le_padded<const N: usize>(value: &BigUint) -> [u8; N] {
    let bytes = value.to_bytes_le();
    let mut out = [0u8; N];
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_encoding_strips_trailing_zeros() {
        let v = from_le(&[0x07, 0x00, 0x00]);
        assert_eq!(to_le(&v), vec![0x07]);
    }

    #[test]
    fn zero_encodes_as_one_byte() {
        let v = BigUint::from(0u8);
        assert_eq!(to_le(&v), vec![0x00]);
    }

    #[test]
    fn padded_encoding_is_fixed_width() {
        let v = from_le(&[0x01, 0x02]);
        let padded: [u8; 4] = to_le_padded(&v);
        assert_eq!(padded, [0x01, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn roundtrip_preserves_value() {
        let v = from_le(&[0xFF, 0x10, 0x00, 0x42]);
        assert_eq!(from_le(&to_le(&v)), v);
    }
}
