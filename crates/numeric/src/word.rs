//! The 256-bit word the transcript hash operates on.
//!
//! A `Word256` is four 64-bit limbs in little-endian limb order. Its byte
//! serialization is big-endian, which is the order it is absorbed into the
//! transcript.

use std::cmp::Ordering;
use std::fmt;

use ark_ff::{BigInteger, PrimeField};
use crypto_bigint::Encoding;
use num_bigint::BigUint;

use crate::uint256::{U256, U256Ext};

/// Number of bytes in one word.
pub const WORD_BYTES: usize = 32;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word256 {
    limbs: [u64; 4],
}

impl Word256 {
    pub const ZERO: Self = Self { limbs: [0; 4] };

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    pub const fn limbs(&self) -> [u64; 4] {
        self.limbs
    }

    pub fn from_u256(value: &U256) -> Self {
        Self { limbs: value.limbs() }
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_limbs(self.limbs)
    }

    pub fn from_be_bytes(bytes: &[u8; WORD_BYTES]) -> Self {
        Self::from_u256(&U256::from_be_bytes(*bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; WORD_BYTES] {
        self.to_u256().to_be_bytes()
    }

    /// Bit `index`, counted from the least significant bit.
    pub fn bit(&self, index: usize) -> bool {
        self.to_u256().get_bit(index as u32)
    }

    /// Bits from most to least significant.
    pub fn to_bits_be(&self) -> [bool; 256] {
        let value = self.to_u256();
        let mut bits = [false; 256];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = value.get_bit(255 - i as u32);
        }
        bits
    }

    /// Number of significant bits.
    pub fn bit_len(&self) -> u32 {
        self.to_u256().bits_vartime()
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.to_be_bytes())
    }

    /// Returns `None` if `value` does not fit in 256 bits.
    pub fn from_biguint(value: &BigUint) -> Option<Self> {
        let bytes = value.to_bytes_be();
        if bytes.len() > WORD_BYTES {
            return None;
        }
        let mut buf = [0u8; WORD_BYTES];
        buf[WORD_BYTES - bytes.len()..].copy_from_slice(&bytes);
        Some(Self::from_be_bytes(&buf))
    }

    /// Canonical encoding of a prime field element.
    pub fn from_field<F: PrimeField>(value: &F) -> Self {
        let bytes = value.into_bigint().to_bytes_be();
        let mut buf = [0u8; WORD_BYTES];
        buf[WORD_BYTES - bytes.len()..].copy_from_slice(&bytes);
        Self::from_be_bytes(&buf)
    }

    /// Interprets the word in `F`, reducing modulo its modulus.
    pub fn to_field_reduced<F: PrimeField>(&self) -> F {
        F::from_be_bytes_mod_order(&self.to_be_bytes())
    }

    /// Interprets the word in `F`, or `None` if it is not below the modulus.
    pub fn to_field<F: PrimeField>(&self) -> Option<F> {
        let modulus = Self::from_biguint(&modulus_biguint::<F>())?;
        if *self < modulus {
            Some(self.to_field_reduced())
        } else {
            None
        }
    }
}

/// The modulus of `F` as an arbitrary-precision integer.
pub fn modulus_biguint<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

impl Ord for Word256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u256().cmp(&other.to_u256())
    }
}

impl PartialOrd for Word256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.to_be_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<u64> for Word256 {
    fn from(value: u64) -> Self {
        Self::from_limbs([value, 0, 0, 0])
    }
}
