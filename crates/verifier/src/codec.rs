//! Conversions between proof bytes, 256-bit words and field wires.
//!
//! An in-circuit `WordT` is 256 boolean wires, most significant first,
//! which is also the byte order the transcript absorbs. Every conversion
//! into a field element proves the word lies below the target modulus.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use h2v_numeric::{modulus_biguint, Word256, WORD_BYTES};
use h2v_stdlib::primitives::bigfield::BigFieldT;
use h2v_stdlib::primitives::bool::BoolT;
use h2v_stdlib::primitives::field::{assert_bits_less_than, FieldT};

use crate::error::{Result, VerifierError};

pub const WORD_BITS: usize = 256;

#[derive(Clone)]
pub struct WordT {
    bits: Vec<BoolT<Fr>>,
}

impl WordT {
    pub fn from_bits_be(bits: Vec<BoolT<Fr>>) -> Self {
        assert_eq!(bits.len(), WORD_BITS, "a word has 256 bits");
        Self { bits }
    }

    pub fn constant(word: &Word256) -> Self {
        Self::from_bits_be(word.to_bits_be().iter().map(|&b| BoolT::constant(b)).collect())
    }

    /// A word from 32 byte wires, most significant byte first. Each byte is
    /// decomposed into 8 bits, so a wider value leaves the builder failed.
    pub fn from_bytes(bytes: &[FieldT<Fr>]) -> Self {
        assert_eq!(bytes.len(), WORD_BYTES, "a word has 32 bytes");
        let bits = bytes
            .iter()
            .flat_map(|byte| byte.to_bits(8).into_iter().rev())
            .collect();
        Self::from_bits_be(bits)
    }

    /// Bits from most to least significant.
    pub fn bits_be(&self) -> &[BoolT<Fr>] {
        &self.bits
    }

    fn bits_le(&self) -> Vec<BoolT<Fr>> {
        self.bits.iter().rev().cloned().collect()
    }

    pub fn get_value(&self) -> Word256 {
        let mut bytes = [0u8; WORD_BYTES];
        for (byte, chunk) in bytes.iter_mut().zip(self.bits.chunks(8)) {
            *byte = chunk
                .iter()
                .fold(0u8, |acc, bit| (acc << 1) | bit.get_value() as u8);
        }
        Word256::from_be_bytes(&bytes)
    }

    /// The word as a native scalar. Values at or above the native modulus
    /// are unsatisfiable.
    pub fn to_scalar(&self) -> FieldT<Fr> {
        let bits = self.bits_le();
        assert_bits_less_than(&bits, &modulus_biguint::<Fr>(), "codec: word exceeds the native modulus");
        FieldT::from_bits(&bits)
    }

    /// Canonical 256-bit form of a native scalar.
    pub fn from_scalar(value: &FieldT<Fr>) -> Self {
        let num_bits = Fr::MODULUS_BIT_SIZE as usize;
        let bits_le = value.to_bits(num_bits);
        if !value.is_constant() {
            assert_bits_less_than(&bits_le, &modulus_biguint::<Fr>(), "codec: non-canonical scalar");
        }
        Self::from_bits_le_padded(bits_le)
    }

    /// The word as an element of the emulated field `T`. The top limb
    /// carries every bit above bit 204, so a word at or above the modulus
    /// of `T` is unsatisfiable.
    pub fn to_foreign_field<T: PrimeField>(&self) -> BigFieldT<Fr, T> {
        BigFieldT::from_bits_le(&self.bits_le())
    }

    /// Canonical 256-bit form of an emulated field element, reduced first.
    pub fn from_foreign_field<T: PrimeField>(element: &BigFieldT<Fr, T>) -> Self {
        Self::from_bits_le_padded(element.to_bits_le())
    }

    fn from_bits_le_padded(mut bits_le: Vec<BoolT<Fr>>) -> Self {
        bits_le.resize(WORD_BITS, BoolT::constant(false));
        bits_le.reverse();
        Self::from_bits_be(bits_le)
    }
}

/// Split byte wires into words. The count must be a whole number of words.
pub fn decode(elements: &[FieldT<Fr>]) -> Result<Vec<WordT>> {
    if elements.len() % WORD_BYTES != 0 {
        return Err(VerifierError::InvalidProofSize {
            len: elements.len(),
        });
    }
    Ok(elements.chunks(WORD_BYTES).map(WordT::from_bytes).collect())
}

/// Native counterpart of `decode`. Elements above 255 are not bytes and
/// make the proof invalid.
pub fn decode_native(elements: &[Fr]) -> Result<Vec<Word256>> {
    if elements.len() % WORD_BYTES != 0 {
        return Err(VerifierError::InvalidProofSize {
            len: elements.len(),
        });
    }
    let bytes = elements
        .iter()
        .map(|e| {
            let limbs = e.into_bigint().0;
            match limbs {
                [low, 0, 0, 0] if low < 256 => Ok(low as u8),
                _ => Err(VerifierError::ProofInvalid),
            }
        })
        .collect::<Result<Vec<u8>>>()?;
    Ok(bytes
        .chunks(WORD_BYTES)
        .map(|chunk| {
            let mut word = [0u8; WORD_BYTES];
            word.copy_from_slice(chunk);
            Word256::from_be_bytes(&word)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fq;
    use h2v_circuit_builder::UltraCircuitChecker;
    use h2v_stdlib::primitives::witness::{new_builder, BuilderRef};
    use proptest::prelude::*;

    fn make_builder() -> BuilderRef<Fr> {
        new_builder()
    }

    fn check_circuit(builder: &BuilderRef<Fr>) -> std::result::Result<(), String> {
        UltraCircuitChecker::check(&builder.borrow())
    }

    fn byte_wires(builder: &BuilderRef<Fr>, word: &Word256) -> Vec<FieldT<Fr>> {
        word.to_be_bytes()
            .iter()
            .map(|&b| FieldT::from_witness(builder.clone(), Fr::from(b as u64)))
            .collect()
    }

    #[test]
    fn test_decode_words() {
        let builder = make_builder();
        let words = [Word256::from(7u64), Word256::from_limbs([1, 2, 3, 4])];
        let bytes: Vec<FieldT<Fr>> = words.iter().flat_map(|w| byte_wires(&builder, w)).collect();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].get_value(), words[0]);
        assert_eq!(decoded[1].get_value(), words[1]);
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_decode_rejects_partial_word() {
        let builder = make_builder();
        let bytes: Vec<FieldT<Fr>> = (0..33)
            .map(|_| FieldT::from_witness(builder.clone(), Fr::from(1u64)))
            .collect();
        assert!(matches!(
            decode(&bytes),
            Err(VerifierError::InvalidProofSize { len: 33 })
        ));
        assert!(matches!(
            decode_native(&vec![Fr::from(0u64); 31]),
            Err(VerifierError::InvalidProofSize { len: 31 })
        ));
    }

    #[test]
    fn test_wide_byte_is_unsatisfiable() {
        let builder = make_builder();
        let mut bytes = byte_wires(&builder, &Word256::from(3u64));
        bytes[5] = FieldT::from_witness(builder.clone(), Fr::from(256u64));
        decode(&bytes).unwrap();
        assert!(check_circuit(&builder).is_err());
        assert!(matches!(
            decode_native(&[vec![Fr::from(0u64); 31], vec![Fr::from(256u64)]].concat()),
            Err(VerifierError::ProofInvalid)
        ));
    }

    #[test]
    fn test_scalar_edge_values() {
        // Both ends of the scalar range.
        let builder = make_builder();
        for value in [Fr::from(0u64), Fr::from(1u64), -Fr::from(1u64)] {
            let wire = FieldT::from_witness(builder.clone(), value);
            let word = WordT::from_scalar(&wire);
            assert_eq!(word.get_value(), Word256::from_field(&value));
            assert_eq!(word.to_scalar().get_value(), value);
        }
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_scalar_overflow_rejected() {
        let builder = make_builder();
        let modulus = Word256::from_biguint(&modulus_biguint::<Fr>()).unwrap();
        let word = WordT::from_bytes(&byte_wires(&builder, &modulus));
        word.to_scalar();
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_foreign_field_conversion() {
        let builder = make_builder();
        let value = -Fq::from(123456789u64);
        let word = WordT::from_bytes(&byte_wires(&builder, &Word256::from_field(&value)));
        let element = word.to_foreign_field::<Fq>();
        assert_eq!(element.get_field_value(), value);
        let back = WordT::from_foreign_field(&element);
        assert_eq!(back.get_value(), Word256::from_field(&value));
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_foreign_field_overflow_rejected() {
        let builder = make_builder();
        let modulus = Word256::from_biguint(&modulus_biguint::<Fq>()).unwrap();
        let word = WordT::from_bytes(&byte_wires(&builder, &modulus));
        word.to_foreign_field::<Fq>();
        assert!(check_circuit(&builder).is_err());

        let builder = make_builder();
        let word = WordT::from_bytes(&byte_wires(&builder, &Word256::from_limbs([0, 0, 0, u64::MAX])));
        word.to_foreign_field::<Fq>();
        assert!(check_circuit(&builder).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_scalar_roundtrip(limbs in any::<[u64; 4]>()) {
            let value: Fr = Word256::from_limbs(limbs).to_field_reduced();
            let builder = make_builder();
            let wire = FieldT::from_witness(builder.clone(), value);
            let word = WordT::from_scalar(&wire);
            prop_assert_eq!(word.get_value(), Word256::from_field(&value));
            let back = word.to_scalar();
            prop_assert_eq!(back.get_value(), value);
            prop_assert!(check_circuit(&builder).is_ok());
        }
    }
}
