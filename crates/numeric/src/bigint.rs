// Conversions between prime field elements and unbounded integers.
//
// The emulated-field gadgets compute their witnesses with `BigUint` and
// only move back into the native field when a wire is created.

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

pub fn field_to_biguint<F: PrimeField>(value: &F) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Reduces `value` modulo the field modulus.
pub fn biguint_to_field<F: PrimeField>(value: &BigUint) -> F {
    F::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Bits `[start, start + len)` of a little-endian limb slice, `len <= 64`.
pub fn slice_limbs(limbs: &[u64], start: usize, len: usize) -> u64 {
    debug_assert!(len <= 64);
    if len == 0 {
        return 0;
    }
    let word = start / 64;
    let offset = start % 64;
    let lo = limbs.get(word).copied().unwrap_or(0) >> offset;
    let hi = if offset == 0 {
        0
    } else {
        limbs.get(word + 1).copied().unwrap_or(0) << (64 - offset)
    };
    let mask = if len == 64 { u64::MAX } else { (1u64 << len) - 1 };
    (lo | hi) & mask
}
