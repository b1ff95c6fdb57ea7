//! SHA-256 Fiat–Shamir transcript.
//!
//! The state is one byte buffer. Absorbing appends big-endian words;
//! squeezing hashes `buffer || 0x00`, replaces the buffer with the digest
//! and returns the digest read little-endian, reduced modulo `Fr`.
//!
//! `read_protocol` drives the round structure once for both the in-circuit
//! chip and the native reference, so the two consume words in lockstep.

use ark_bn254::{Fq, Fr, G1Affine};
use ark_ff::PrimeField;
use h2v_numeric::{Word256, WORD_BYTES};
use h2v_stdlib::hash::sha256::sha256;
use h2v_stdlib::primitives::bool::BoolT;
use h2v_stdlib::primitives::field::FieldT;
use h2v_stdlib::primitives::witness::BuilderRef;
use sha2::{Digest, Sha256};

use crate::codec::WordT;
use crate::config::Config;
use crate::error::{Result, VerifierError};
use crate::instance::G1;

const CHALLENGE_SUFFIX: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptState {
    Empty,
    Absorbing,
    Squeezed,
}

/// The transcript operations the protocol is written against.
pub trait TranscriptRead {
    type Point: Clone;
    type Scalar: Clone;

    /// Absorb a point that did not come from the proof.
    fn common_point(&mut self, point: &Self::Point);
    /// Read a point from the proof, check it is on the curve and absorb it.
    fn read_point(&mut self) -> Result<Self::Point>;
    /// Read a scalar from the proof and absorb it.
    fn read_scalar(&mut self) -> Result<Self::Scalar>;
    fn squeeze_challenge(&mut self) -> Self::Scalar;
    fn remaining_words(&self) -> usize;
    fn state(&self) -> TranscriptState;
}

#[derive(Clone)]
pub struct Challenges<S> {
    pub theta: S,
    pub beta: S,
    pub gamma: S,
    pub y: S,
    pub x: S,
    pub multiopen_y: S,
    pub v: S,
    pub u: S,
}

impl<S: Clone> Challenges<S> {
    /// In squeeze order.
    pub fn to_vec(&self) -> Vec<S> {
        vec![
            self.theta.clone(),
            self.beta.clone(),
            self.gamma.clone(),
            self.y.clone(),
            self.x.clone(),
            self.multiopen_y.clone(),
            self.v.clone(),
            self.u.clone(),
        ]
    }
}

#[derive(Clone)]
pub struct TranscriptOutput<P, S> {
    pub challenges: Challenges<S>,
    /// Instance commitments first, then the proof's commitments in absorb
    /// order. `h1` and `h2` are kept apart.
    pub commitments: Vec<P>,
    pub evals: Vec<S>,
    pub h1: P,
    pub h2: P,
}

fn read_points<T: TranscriptRead>(transcript: &mut T, count: usize, into: &mut Vec<T::Point>) -> Result<()> {
    for _ in 0..count {
        into.push(transcript.read_point()?);
    }
    Ok(())
}

/// Run the protocol rounds over a transcript seeded with the init scalar.
pub fn read_protocol<T: TranscriptRead>(
    transcript: &mut T,
    config: &Config,
    instance_commitments: &[T::Point],
) -> Result<TranscriptOutput<T::Point, T::Scalar>> {
    let expected = config.expected_words();
    let actual = transcript.remaining_words();
    if actual != expected {
        return Err(VerifierError::InvalidTranscriptLength { expected, actual });
    }

    for commitment in instance_commitments {
        transcript.common_point(commitment);
    }
    let mut commitments = instance_commitments.to_vec();

    read_points(transcript, config.nb_advices, &mut commitments)?;
    let theta = transcript.squeeze_challenge();

    read_points(transcript, config.nb_lookups_m, &mut commitments)?;
    let beta = transcript.squeeze_challenge();
    let gamma = transcript.squeeze_challenge();

    read_points(
        transcript,
        config.nb_permutation_groups + config.nb_lookups_zs + 1,
        &mut commitments,
    )?;
    let y = transcript.squeeze_challenge();

    read_points(transcript, config.degree, &mut commitments)?;
    let x = transcript.squeeze_challenge();

    let evals = (0..config.nb_evals)
        .map(|_| transcript.read_scalar())
        .collect::<Result<Vec<_>>>()?;

    let multiopen_y = transcript.squeeze_challenge();
    let v = transcript.squeeze_challenge();

    let h1 = transcript.read_point()?;
    let u = transcript.squeeze_challenge();
    let h2 = transcript.read_point()?;

    let remaining = transcript.remaining_words();
    if remaining != 0 {
        return Err(VerifierError::InvalidTranscriptLength {
            expected,
            actual: expected + remaining,
        });
    }

    Ok(TranscriptOutput {
        challenges: Challenges {
            theta,
            beta,
            gamma,
            y,
            x,
            multiopen_y,
            v,
            u,
        },
        commitments,
        evals,
        h1,
        h2,
    })
}

fn out_of_words(expected: usize, consumed: usize) -> VerifierError {
    VerifierError::InvalidTranscriptLength {
        expected: expected.max(consumed + 1),
        actual: consumed,
    }
}

// ════════════════════════════════════════════════════════════════════════
//  In-circuit transcript
// ════════════════════════════════════════════════════════════════════════

pub struct TranscriptChip {
    ctx: BuilderRef<Fr>,
    /// Absorbed bytes as bits, most significant bit of each byte first.
    buffer: Vec<BoolT<Fr>>,
    words: Vec<WordT>,
    position: usize,
    state: TranscriptState,
}

impl TranscriptChip {
    pub fn new(ctx: BuilderRef<Fr>, init_scalar: Fr, words: Vec<WordT>) -> Self {
        let mut chip = Self {
            ctx,
            buffer: Vec::new(),
            words,
            position: 0,
            state: TranscriptState::Empty,
        };
        chip.absorb_word(&WordT::constant(&Word256::from_field(&init_scalar)));
        chip
    }

    pub fn absorb_word(&mut self, word: &WordT) {
        self.buffer.extend_from_slice(word.bits_be());
        self.state = TranscriptState::Absorbing;
    }

    fn next_word(&mut self) -> Result<WordT> {
        let word = self
            .words
            .get(self.position)
            .cloned()
            .ok_or_else(|| out_of_words(self.words.len(), self.position))?;
        self.position += 1;
        Ok(word)
    }
}

impl TranscriptRead for TranscriptChip {
    type Point = G1;
    type Scalar = FieldT<Fr>;

    fn common_point(&mut self, point: &G1) {
        self.absorb_word(&WordT::from_foreign_field(&point.x));
        self.absorb_word(&WordT::from_foreign_field(&point.y));
    }

    fn read_point(&mut self) -> Result<G1> {
        let x = self.next_word()?.to_foreign_field::<Fq>();
        let y = self.next_word()?.to_foreign_field::<Fq>();
        let point = G1::from_coordinates(x, y);
        point.assert_on_curve("transcript: point is not on the curve");
        self.common_point(&point);
        Ok(point)
    }

    fn read_scalar(&mut self) -> Result<FieldT<Fr>> {
        let word = self.next_word()?;
        let scalar = word.to_scalar();
        self.absorb_word(&word);
        Ok(scalar)
    }

    fn squeeze_challenge(&mut self) -> FieldT<Fr> {
        let mut message = std::mem::take(&mut self.buffer);
        message.extend(
            (0..8)
                .rev()
                .map(|i| BoolT::constant_with_context(self.ctx.clone(), (CHALLENGE_SUFFIX >> i) & 1 == 1)),
        );
        let digest = sha256(&message);
        let little_endian: Vec<BoolT<Fr>> = digest
            .chunks(8)
            .flat_map(|byte| byte.iter().rev().cloned())
            .collect();
        self.buffer = digest;
        self.state = TranscriptState::Squeezed;
        FieldT::from_bits(&little_endian)
    }

    fn remaining_words(&self) -> usize {
        self.words.len() - self.position
    }

    fn state(&self) -> TranscriptState {
        self.state
    }
}

// ════════════════════════════════════════════════════════════════════════
//  Native transcript
// ════════════════════════════════════════════════════════════════════════

/// Out-of-circuit transcript. Malformed proof content is `ProofInvalid`.
pub struct NativeTranscript {
    buffer: Vec<u8>,
    words: Vec<Word256>,
    position: usize,
    state: TranscriptState,
}

impl NativeTranscript {
    pub fn new(init_scalar: Fr, words: Vec<Word256>) -> Self {
        let mut transcript = Self {
            buffer: Vec::new(),
            words,
            position: 0,
            state: TranscriptState::Empty,
        };
        transcript.absorb_bytes(&Word256::from_field(&init_scalar).to_be_bytes());
        transcript
    }

    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.state = TranscriptState::Absorbing;
    }

    pub fn absorb_scalar(&mut self, scalar: &Fr) {
        self.absorb_bytes(&Word256::from_field(scalar).to_be_bytes());
    }

    fn next_word(&mut self) -> Result<Word256> {
        let word = *self
            .words
            .get(self.position)
            .ok_or_else(|| out_of_words(self.words.len(), self.position))?;
        self.position += 1;
        Ok(word)
    }

    /// The buffer contents, for test vectors.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

impl TranscriptRead for NativeTranscript {
    type Point = G1Affine;
    type Scalar = Fr;

    /// The identity has coordinates `(0, 0)` and is absorbed as such.
    fn common_point(&mut self, point: &G1Affine) {
        self.absorb_bytes(&Word256::from_field(&point.x).to_be_bytes());
        self.absorb_bytes(&Word256::from_field(&point.y).to_be_bytes());
    }

    fn read_point(&mut self) -> Result<G1Affine> {
        let x = self.next_word()?.to_field::<Fq>().ok_or(VerifierError::ProofInvalid)?;
        let y = self.next_word()?.to_field::<Fq>().ok_or(VerifierError::ProofInvalid)?;
        let point = G1Affine::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(VerifierError::ProofInvalid);
        }
        self.common_point(&point);
        Ok(point)
    }

    fn read_scalar(&mut self) -> Result<Fr> {
        let word = self.next_word()?;
        let scalar = word.to_field::<Fr>().ok_or(VerifierError::ProofInvalid)?;
        self.absorb_bytes(&word.to_be_bytes());
        Ok(scalar)
    }

    fn squeeze_challenge(&mut self) -> Fr {
        self.buffer.push(CHALLENGE_SUFFIX);
        let digest: [u8; 32] = Sha256::digest(&self.buffer).into();
        self.buffer = digest.to_vec();
        self.state = TranscriptState::Squeezed;
        Fr::from_le_bytes_mod_order(&digest)
    }

    fn remaining_words(&self) -> usize {
        self.words.len() - self.position
    }

    fn state(&self) -> TranscriptState {
        self.state
    }
}

/// Words of a transcript as bytes, for building proofs.
pub fn words_to_bytes(words: &[Word256]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * WORD_BYTES);
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}
