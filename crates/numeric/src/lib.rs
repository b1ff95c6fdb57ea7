// Numeric types shared by the verifier crates.
//
// - bigint: field <-> BigUint conversions and limb slicing
// - uint256: 256-bit integer backed by crypto-bigint
// - word: the 256-bit transcript word (four 64-bit limbs)

pub mod bigint;
pub mod uint256;
pub mod word;

pub use bigint::{biguint_to_field, field_to_biguint, slice_limbs};
pub use uint256::{U256, U256Ext};
pub use word::{modulus_biguint, Word256, WORD_BYTES};
