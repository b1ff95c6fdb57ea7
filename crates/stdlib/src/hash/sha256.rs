//! In-circuit SHA-256.
//!
//! Words are 32 boolean wires, least significant bit first, so rotations
//! and shifts are free re-indexing. Modular additions are accumulated as
//! native field sums and decomposed back into bits, dropping the carries.

use ark_ff::PrimeField;

use crate::primitives::bool::BoolT;
use crate::primitives::field::FieldT;

/// 32 boolean wires, least significant first.
pub type Word<F> = Vec<BoolT<F>>;

const WORD_BITS: usize = 32;
const BLOCK_BITS: usize = 512;

pub const INIT_CONSTANTS: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const ROUND_CONSTANTS: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5,
    0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3,
    0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc,
    0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7,
    0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13,
    0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3,
    0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5,
    0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208,
    0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

// ════════════════════════════════════════════════════════════════════════
//  Word helpers
// ════════════════════════════════════════════════════════════════════════

pub fn constant_word<F: PrimeField>(value: u32) -> Word<F> {
    (0..WORD_BITS)
        .map(|i| BoolT::constant((value >> i) & 1 == 1))
        .collect()
}

fn word_field<F: PrimeField>(word: &[BoolT<F>]) -> FieldT<F> {
    FieldT::from_bits(word)
}

fn rotr<F: PrimeField>(word: &[BoolT<F>], n: usize) -> Word<F> {
    (0..WORD_BITS).map(|i| word[(i + n) % WORD_BITS].clone()).collect()
}

fn shr<F: PrimeField>(word: &[BoolT<F>], n: usize) -> Word<F> {
    (0..WORD_BITS)
        .map(|i| match word.get(i + n) {
            Some(bit) => bit.clone(),
            None => BoolT::constant(false),
        })
        .collect()
}

fn xor3<F: PrimeField>(a: &[BoolT<F>], b: &[BoolT<F>], c: &[BoolT<F>]) -> Word<F> {
    a.iter()
        .zip(b)
        .zip(c)
        .map(|((x, y), z)| &(x ^ y) ^ z)
        .collect()
}

/// `(sum of terms) mod 2^32`, decomposed into bits.
fn add_normalize<F: PrimeField>(terms: &[FieldT<F>]) -> Word<F> {
    let sum = FieldT::accumulate(terms);
    // Five 32-bit terms at most, so three carry bits.
    let mut bits = sum.to_bits(WORD_BITS + 3);
    bits.truncate(WORD_BITS);
    bits
}

// ════════════════════════════════════════════════════════════════════════
//  Round functions
// ════════════════════════════════════════════════════════════════════════

fn big_sigma0<F: PrimeField>(a: &[BoolT<F>]) -> FieldT<F> {
    word_field(&xor3(&rotr(a, 2), &rotr(a, 13), &rotr(a, 22)))
}

fn big_sigma1<F: PrimeField>(e: &[BoolT<F>]) -> FieldT<F> {
    word_field(&xor3(&rotr(e, 6), &rotr(e, 11), &rotr(e, 25)))
}

fn small_sigma0<F: PrimeField>(w: &[BoolT<F>]) -> FieldT<F> {
    word_field(&xor3(&rotr(w, 7), &rotr(w, 18), &shr(w, 3)))
}

fn small_sigma1<F: PrimeField>(w: &[BoolT<F>]) -> FieldT<F> {
    word_field(&xor3(&rotr(w, 17), &rotr(w, 19), &shr(w, 10)))
}

/// `Ch(e, f, g) = g + e * (f - g)` per bit.
fn choose<F: PrimeField>(e: &[BoolT<F>], f: &[BoolT<F>], g: &[BoolT<F>]) -> FieldT<F> {
    let mut shift = F::one();
    let terms: Vec<FieldT<F>> = e
        .iter()
        .zip(f)
        .zip(g)
        .map(|((e, f), g)| {
            let g = g.to_field();
            let bit = e.to_field().madd(&(f.to_field() - g.clone()), &g);
            let term = bit * FieldT::from_field(shift);
            shift = shift + shift;
            term
        })
        .collect();
    FieldT::accumulate(&terms)
}

/// `Maj(a, b, c) = a*b + c * (a xor b)` per bit; the two products are
/// never both set.
fn majority<F: PrimeField>(a: &[BoolT<F>], b: &[BoolT<F>], c: &[BoolT<F>]) -> FieldT<F> {
    let mut shift = F::one();
    let terms: Vec<FieldT<F>> = a
        .iter()
        .zip(b)
        .zip(c)
        .map(|((a, b), c)| {
            let both = (a & b).to_field();
            let either = (a ^ b).to_field();
            let bit = c.to_field().madd(&either, &both);
            let term = bit * FieldT::from_field(shift);
            shift = shift + shift;
            term
        })
        .collect();
    FieldT::accumulate(&terms)
}

/// Extend the 16-word block to the 64-word message schedule.
fn extend_witness<F: PrimeField>(block: &[Word<F>; 16]) -> Vec<Word<F>> {
    let mut w: Vec<Word<F>> = block.to_vec();
    for i in 16..64 {
        let next = add_normalize(&[
            small_sigma1(&w[i - 2]),
            word_field(&w[i - 7]),
            small_sigma0(&w[i - 15]),
            word_field(&w[i - 16]),
        ]);
        w.push(next);
    }
    w
}

// ════════════════════════════════════════════════════════════════════════
//  Compression
// ════════════════════════════════════════════════════════════════════════

/// One compression of a 512-bit block into the eight-word state.
pub fn compress<F: PrimeField>(state: &[Word<F>; 8], block: &[Word<F>; 16]) -> [Word<F>; 8] {
    let w = extend_witness(block);
    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = state.clone();

    for i in 0..64 {
        let round_constant = FieldT::from_u64(ROUND_CONSTANTS[i] as u64);
        let temp1 = FieldT::accumulate(&[
            word_field(&h),
            big_sigma1(&e),
            choose(&e, &f, &g),
            round_constant,
            word_field(&w[i]),
        ]);
        let temp2 = big_sigma0(&a) + majority(&a, &b, &c);

        h = g;
        g = f;
        f = e;
        e = add_normalize(&[word_field(&d), temp1.clone()]);
        d = c;
        c = b;
        b = a;
        a = add_normalize(&[temp1, temp2]);
    }

    let rounds = [a, b, c, d, e, f, g, h];
    std::array::from_fn(|i| add_normalize(&[word_field(&state[i]), word_field(&rounds[i])]))
}

/// Compression on 32-bit field words, each range constrained by its
/// decomposition.
pub fn sha256_block<F: PrimeField>(h_init: &[FieldT<F>; 8], input: &[FieldT<F>; 16]) -> [FieldT<F>; 8] {
    let state = h_init.clone().map(|word| word.to_bits(WORD_BITS));
    let block = input.clone().map(|word| word.to_bits(WORD_BITS));
    compress(&state, &block).map(|word| word_field(&word))
}

/// SHA-256 of a byte string given as bits, most significant bit of the
/// first byte first. Returns the 256 digest bits in the same order.
pub fn sha256<F: PrimeField>(message: &[BoolT<F>]) -> Vec<BoolT<F>> {
    assert!(message.len() % 8 == 0, "message must be whole bytes");
    let mut padded = message.to_vec();
    padded.push(BoolT::constant(true));
    while padded.len() % BLOCK_BITS != BLOCK_BITS - 64 {
        padded.push(BoolT::constant(false));
    }
    let length = message.len() as u64;
    padded.extend((0..64).rev().map(|i| BoolT::constant((length >> i) & 1 == 1)));

    let mut state: [Word<F>; 8] = INIT_CONSTANTS.map(constant_word::<F>);
    for chunk in padded.chunks(BLOCK_BITS) {
        let block: [Word<F>; 16] = std::array::from_fn(|j| {
            chunk[j * WORD_BITS..(j + 1) * WORD_BITS]
                .iter()
                .rev()
                .cloned()
                .collect()
        });
        state = compress(&state, &block);
    }
    state
        .iter()
        .flat_map(|word| word.iter().rev().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::witness::{new_builder, BuilderRef, WitnessT};
    use ark_bn254::Fr;
    use h2v_circuit_builder::UltraCircuitChecker;
    use sha2::{Digest, Sha256};

    type P = Fr;

    fn make_builder() -> BuilderRef<P> {
        new_builder()
    }

    fn check_circuit(builder: &BuilderRef<P>) -> Result<(), String> {
        UltraCircuitChecker::check(&builder.borrow())
    }

    fn word_value(word: &FieldT<P>) -> u32 {
        word.get_value().into_bigint().0[0] as u32
    }

    fn message_bits(builder: &BuilderRef<P>, message: &[u8]) -> Vec<BoolT<P>> {
        message
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
            .map(|bit| BoolT::from_witness(&WitnessT::from_bool(builder.clone(), bit)))
            .collect()
    }

    fn digest_bytes(bits: &[BoolT<P>]) -> Vec<u8> {
        bits.chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, bit| (acc << 1) | bit.get_value() as u8))
            .collect()
    }

    #[test]
    fn test_sha256_block_nist_vector_one() {
        let builder = make_builder();
        let padded_block: [u32; 16] = [
            0x61626380, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x00000018,
        ];
        let expected: [u32; 8] = [
            0xba7816bf, 0x8f01cfea, 0x414140de, 0x5dae2223,
            0xb00361a3, 0x96177a9c, 0xb410ff61, 0xf20015ad,
        ];

        let h_init: [FieldT<P>; 8] = std::array::from_fn(|i| {
            FieldT::from_witness(builder.clone(), Fr::from(INIT_CONSTANTS[i] as u64))
        });
        let block: [FieldT<P>; 16] = std::array::from_fn(|i| {
            FieldT::from_witness(builder.clone(), Fr::from(padded_block[i] as u64))
        });
        let output = sha256_block(&h_init, &block);
        for i in 0..8 {
            assert_eq!(word_value(&output[i]), expected[i], "mismatch at word {i}");
        }
        check_circuit(&builder).expect("circuit check failed");
    }

    #[test]
    fn test_sha256_nist_vector_two() {
        let builder = make_builder();
        let message = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
        let digest = sha256(&message_bits(&builder, message));
        assert_eq!(digest.len(), 256);
        let expected: [u8; 32] = Sha256::digest(message).into();
        assert_eq!(digest_bytes(&digest), expected.to_vec());
        assert_eq!(
            &expected[..4],
            &[0x24, 0x8d, 0x6a, 0x61],
            "two-block NIST vector"
        );
        check_circuit(&builder).expect("circuit check failed");
    }

    #[test]
    fn test_sha256_empty_and_byte_boundaries() {
        let builder = make_builder();
        for len in [0usize, 1, 55, 56, 64] {
            let message: Vec<u8> = (0..len as u8).map(|i| i.wrapping_mul(37)).collect();
            let digest = sha256(&message_bits(&builder, &message));
            let expected: [u8; 32] = Sha256::digest(&message).into();
            assert_eq!(digest_bytes(&digest), expected.to_vec(), "length {len}");
        }
        check_circuit(&builder).expect("circuit check failed");
    }

    #[test]
    fn test_tampered_message_schedule_fails() {
        let builder = make_builder();
        let block: [Word<P>; 16] = std::array::from_fn(|i| {
            (0..WORD_BITS)
                .map(|j| {
                    BoolT::from_witness(&WitnessT::from_bool(builder.clone(), (i * 7 + j) % 3 == 0))
                })
                .collect()
        });
        let schedule = extend_witness(&block);
        check_circuit(&builder).expect("circuit should be valid before modification");

        let tampered = schedule[40][5].witness_index;
        let backup = builder.borrow().base.get_variable(tampered);
        let flipped = Fr::from(1u64) - backup;
        builder.borrow_mut().base.set_variable_unchecked(tampered, flipped);
        assert!(check_circuit(&builder).is_err());
    }
}
