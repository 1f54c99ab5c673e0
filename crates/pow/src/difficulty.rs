//! Compact target ("bits") codec and target comparisons.
//!
//! The compact form packs a 256-bit target into one exponent byte and a
//! three-byte mantissa. Decoding is exact; encoding is canonical and may
//! drop low mantissa bytes, so `decode(encode(t))` is not `t` in general
//! while `encode(decode(bits))` always yields the canonical spelling of
//! `bits`.

use primitive_types::U256;
use spvkit_consensus::Hash256;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactError {
    Negative,
    Overflow,
}

impl std::fmt::Display for CompactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactError::Negative => write!(f, "negative compact target"),
            CompactError::Overflow => write!(f, "compact target exceeds 256 bits"),
        }
    }
}

impl std::error::Error for CompactError {}

/// Expands compact bits to the full target, rejecting the sign bit and
/// exponents that would place mantissa bytes above byte 31.
pub fn compact_to_u256(bits: u32) -> Result<U256, CompactError> {
    if bits & SIGN_BIT != 0 {
        return Err(CompactError::Negative);
    }

    let exponent = bits >> 24;
    let mantissa = bits & MANTISSA_MASK;
    if exponent <= 3 {
        return Ok(U256::from(mantissa >> (8 * (3 - exponent))));
    }

    let mantissa_bytes = 4 - mantissa.leading_zeros() / 8;
    if mantissa != 0 && exponent + mantissa_bytes > 35 {
        return Err(CompactError::Overflow);
    }
    Ok(U256::from(mantissa) << (8 * (exponent - 3)))
}

/// Packs a target into compact bits canonically: the shortest exponent
/// whose mantissa keeps its sign bit clear.
pub fn u256_to_compact(value: U256) -> u32 {
    if value.is_zero() {
        return 0;
    }

    let exponent = (value.bits() as u32).div_ceil(8);
    let mantissa = if exponent <= 3 {
        value.low_u32() << (8 * (3 - exponent))
    } else {
        (value >> (8 * (exponent - 3))).low_u32()
    };

    // 0x800000 and up would decode as negative; shift one byte out.
    if mantissa & SIGN_BIT != 0 {
        (exponent + 1) << 24 | mantissa >> 8
    } else {
        exponent << 24 | mantissa
    }
}

pub fn compact_to_target(bits: u32) -> Result<Hash256, CompactError> {
    compact_to_u256(bits).map(|value| value.to_little_endian())
}

pub fn target_to_compact(target: &Hash256) -> u32 {
    u256_to_compact(U256::from_little_endian(target))
}

pub fn hash_meets_target(hash: &Hash256, target: &Hash256) -> bool {
    U256::from_little_endian(hash) <= U256::from_little_endian(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_targets() {
        let target = compact_to_u256(0x1d00_ffff).expect("max target");
        assert_eq!(target, U256::from(0xffffu64) << 208);

        let target = compact_to_u256(0x207f_ffff).expect("regtest target");
        assert_eq!(target, U256::from(0x7f_ffffu64) << 232);

        let target = compact_to_u256(0x0101_0000).expect("unit target");
        assert_eq!(target, U256::from(1u64));

        assert_eq!(compact_to_u256(0).expect("zero"), U256::zero());
    }

    #[test]
    fn canonical_bits_roundtrip() {
        for bits in [
            0x1d00_ffffu32,
            0x207f_ffff,
            0x1c3f_ffc0,
            0x1806_b99f,
            0x1703_4219,
            0x0404_3456,
            0x0101_0000,
        ] {
            let target = compact_to_u256(bits).expect("target");
            assert_eq!(u256_to_compact(target), bits, "bits {bits:#010x}");
        }
    }

    #[test]
    fn encode_canonicalizes_padded_mantissas() {
        // Exponent one too large with a short mantissa.
        let target = compact_to_u256(0x1d00_3456).expect("target");
        assert_eq!(u256_to_compact(target), 0x1c34_5600);

        // Low-order mantissa byte dropped when the sign bit forces padding.
        let value = U256::from(0x00aa_bbccu64);
        let bits = u256_to_compact(value);
        assert_eq!(bits, 0x0400_aabb);
        assert_eq!(
            compact_to_u256(bits).expect("padded target"),
            U256::from(0x00aa_bb00u64)
        );
    }

    #[test]
    fn sign_bit_is_rejected() {
        assert_eq!(compact_to_u256(0x0180_3456), Err(CompactError::Negative));
        assert_eq!(compact_to_u256(0x0492_3456), Err(CompactError::Negative));
    }

    #[test]
    fn oversized_exponents_are_rejected() {
        assert_eq!(compact_to_u256(0xff12_3456), Err(CompactError::Overflow));
        assert_eq!(compact_to_u256(0x2300_0001), Err(CompactError::Overflow));
        assert_eq!(compact_to_u256(0x2112_3456), Err(CompactError::Overflow));

        // Largest still-representable exponent for a one-byte mantissa.
        let target = compact_to_u256(0x2200_0001).expect("high exponent");
        assert_eq!(target, U256::from(1u64) << 248);
    }

    #[test]
    fn zero_word_never_overflows() {
        assert_eq!(compact_to_u256(0xff00_0000).expect("empty"), U256::zero());
        assert_eq!(compact_to_u256(0x0012_3456).expect("shifted out"), U256::zero());
    }
}
